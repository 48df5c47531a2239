use crate::error::{ConfigError, SimError};
use crate::modules::{EventLogProcessor, ScriptedGenerator, ShortestPathProcessor, build_module};
use crate::net::{LinkId, NetAction, Network, NodeId};
use crate::sim::{
    Capability, Destination, Event, EventQueue, ModuleContext, ModuleSpec, ParamMap,
    ScenarioSpec, ScriptedEventSpec, SimModule, SimParams, SimTime,
};

/// a -> b -> d 与 a -> c -> d 两条两跳路径，一条 a 到 d 的业务
struct Diamond {
    net: Network,
    d: NodeId,
    c: NodeId,
    ab: LinkId,
    bd: LinkId,
    ac: LinkId,
    cd: LinkId,
}

fn diamond() -> Diamond {
    let mut net = Network::default();
    let layer = net.add_layer("ip");
    let a = net.add_node("a");
    let b = net.add_node("b");
    let c = net.add_node("c");
    let d = net.add_node("d");
    let ab = net.add_link(layer, a, b, 10.0).expect("a->b");
    let bd = net.add_link(layer, b, d, 10.0).expect("b->d");
    let ac = net.add_link(layer, a, c, 10.0).expect("a->c");
    let cd = net.add_link(layer, c, d, 10.0).expect("c->d");
    net.add_demand(layer, a, d, 4.0).expect("demand");
    Diamond {
        net,
        d,
        c,
        ab,
        bd,
        ac,
        cd,
    }
}

fn occupied(net: &Network, links: &[LinkId]) -> Vec<f64> {
    links
        .iter()
        .map(|id| net.link(*id).map_or(f64::NAN, |l| l.occupied))
        .collect()
}

fn carried(net: &Network) -> f64 {
    net.demands().map(|d| d.carried).sum()
}

fn apply(
    module: &mut dyn SimModule,
    net: &mut Network,
    t: f64,
    action: NetAction,
) -> Result<(), SimError> {
    let mut queue = EventQueue::new();
    let mut ctx = ModuleContext::new(&mut queue);
    module.process_event(
        &mut ctx,
        net,
        &Event::new(SimTime(t), Destination::Processor, action),
    )
}

fn init(module: &mut dyn SimModule, net: &mut Network, queue: &mut EventQueue) {
    let mut ctx = ModuleContext::new(queue);
    module
        .initialize(
            &mut ctx,
            net,
            &ParamMap::new(),
            &SimParams::default(),
            &ParamMap::new(),
        )
        .expect("initialize");
}

#[test]
fn shortest_path_reroutes_around_failures() {
    let Diamond {
        mut net,
        d,
        c,
        ab,
        bd,
        ac,
        cd,
    } = diamond();
    let all = [ab, bd, ac, cd];
    let mut sp = ShortestPathProcessor::default();
    init(&mut sp, &mut net, &mut EventQueue::new());

    // 跳数相同时取链路 id 较小的路径
    assert_eq!(occupied(&net, &all), [4.0, 4.0, 0.0, 0.0]);
    assert_eq!(carried(&net), 4.0);

    apply(&mut sp, &mut net, 1.0, NetAction::FailLink { link: bd }).expect("fail b->d");
    assert_eq!(occupied(&net, &all), [0.0, 0.0, 4.0, 4.0]);

    apply(&mut sp, &mut net, 2.0, NetAction::FailNode { node: c }).expect("fail c");
    assert_eq!(occupied(&net, &all), [0.0, 0.0, 0.0, 0.0]);
    assert_eq!(carried(&net), 0.0);

    apply(&mut sp, &mut net, 3.0, NetAction::RepairLink { link: bd }).expect("repair b->d");
    assert_eq!(occupied(&net, &all), [4.0, 4.0, 0.0, 0.0]);

    apply(&mut sp, &mut net, 4.0, NetAction::FailNode { node: d }).expect("fail egress");
    assert_eq!(carried(&net), 0.0);
}

#[test]
fn shortest_path_ignores_foreign_payloads_and_wraps_errors() {
    let Diamond { mut net, ab, .. } = diamond();
    let mut sp = ShortestPathProcessor::default();
    init(&mut sp, &mut net, &mut EventQueue::new());
    let before = net.clone();

    let mut queue = EventQueue::new();
    let mut ctx = ModuleContext::new(&mut queue);
    sp.process_event(
        &mut ctx,
        &mut net,
        &Event::tick(SimTime(1.0), Destination::Processor),
    )
    .expect("tick is ignored");
    assert_eq!(net, before);

    let err = apply(&mut sp, &mut net, 2.0, NetAction::FailLink { link: LinkId(999) })
        .expect_err("unknown link");
    assert!(matches!(err, SimError::Module { ref module, .. } if module == "shortest_path"));
    assert_eq!(net.link(ab).map(|l| l.occupied), Some(4.0));
}

#[test]
fn shortest_path_ignores_capacity_and_serves_local_demands() {
    let mut net = Network::default();
    let layer = net.add_layer("ip");
    let a = net.add_node("a");
    let b = net.add_node("b");
    let ab = net.add_link(layer, a, b, 5.0).expect("link");
    net.add_demand(layer, a, b, 8.0).expect("demand");
    net.add_demand(layer, a, a, 3.0).expect("local demand");

    let mut sp = ShortestPathProcessor::default();
    init(&mut sp, &mut net, &mut EventQueue::new());
    let link = net.link(ab).expect("link");
    assert_eq!(link.occupied, 8.0);
    assert_eq!(link.oversubscribed(), 3.0);
    assert_eq!(carried(&net), 11.0);
}

#[test]
fn event_log_counts_actions_by_kind() {
    let Diamond { mut net, ab, .. } = diamond();
    let before = net.clone();
    let mut log = EventLogProcessor::default();
    for action in [
        NetAction::FailLink { link: ab },
        NetAction::RepairLink { link: ab },
        NetAction::FailLink { link: ab },
    ] {
        apply(&mut log, &mut net, 1.0, action).expect("count");
    }
    let mut queue = EventQueue::new();
    let mut ctx = ModuleContext::new(&mut queue);
    log.process_event(
        &mut ctx,
        &mut net,
        &Event::tick(SimTime(1.0), Destination::Processor),
    )
    .expect("count tick");

    assert_eq!(net, before, "event log never mutates the network");
    assert_eq!(log.count("fail_link"), 2);
    assert_eq!(log.count("repair_link"), 1);
    assert_eq!(log.count("set_capacity"), 0);
    assert_eq!(log.other(), 1);

    let mut out = String::new();
    assert_eq!(log.finish(&mut out, SimTime(2.0)), "Event log");
    assert!(out.contains("fail_link: 2"));

    log.finish_transitory(SimTime(3.0));
    assert_eq!(log.count("fail_link"), 0);
}

#[test]
fn scripted_generator_replays_in_time_order() {
    let Diamond { mut net, ab, bd, .. } = diamond();
    let script = vec![
        ScriptedEventSpec {
            at: 2.0,
            action: NetAction::FailLink { link: ab },
        },
        ScriptedEventSpec {
            at: 1.0,
            action: NetAction::FailLink { link: bd },
        },
        ScriptedEventSpec {
            at: 2.0,
            action: NetAction::RepairLink { link: bd },
        },
    ];
    let mut generator = ScriptedGenerator::new(script);
    let mut queue = EventQueue::new();
    init(&mut generator, &mut net, &mut queue);

    let mut forwarded = Vec::new();
    while let Some(ev) = queue.pop_next_event() {
        match ev.destination {
            Destination::Generator => {
                let mut ctx = ModuleContext::new(&mut queue);
                generator
                    .process_event(&mut ctx, &mut net, &ev)
                    .expect("generator step");
            }
            Destination::Processor => {
                let time = ev.time.0;
                let action = ev.into_payload::<NetAction>().expect("NetAction payload");
                forwarded.push((time, action));
            }
        }
    }

    assert_eq!(
        forwarded,
        vec![
            (1.0, NetAction::FailLink { link: bd }),
            (2.0, NetAction::FailLink { link: ab }),
            (2.0, NetAction::RepairLink { link: bd }),
        ]
    );
    assert_eq!(generator.emitted(), 3);
}

fn empty_scenario() -> ScenarioSpec {
    ScenarioSpec::from_json_str(r#"{ "schema_version": 1, "topology": {} }"#)
        .expect("minimal scenario")
}

fn composite(kinds: &[&str]) -> ModuleSpec {
    let mut spec = ModuleSpec::new("composite");
    spec.modules = kinds.iter().map(|k| ModuleSpec::new(*k)).collect();
    spec
}

#[test]
fn registry_builds_known_kinds() {
    let scenario = empty_scenario();
    for (kind, capability) in [
        ("scripted", Capability::Generator),
        ("shortest_path", Capability::Processor),
        ("event_log", Capability::Processor),
    ] {
        let module = build_module(&ModuleSpec::new(kind), &scenario).expect(kind);
        assert_eq!(module.name(), kind);
        assert_eq!(module.capability(), capability);
    }

    let combo = build_module(&composite(&["shortest_path", "event_log"]), &scenario)
        .expect("composite of processors");
    assert_eq!(combo.capability(), Capability::Processor);
}

#[test]
fn registry_rejects_unknown_and_mixed_kinds() {
    let scenario = empty_scenario();
    assert!(matches!(
        build_module(&ModuleSpec::new("nope"), &scenario),
        Err(SimError::Config(ConfigError::UnknownModule(ref k))) if k == "nope"
    ));
    assert!(matches!(
        build_module(&composite(&["scripted", "shortest_path"]), &scenario),
        Err(SimError::Config(ConfigError::Capability { .. }))
    ));
}
