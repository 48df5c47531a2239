use crate::error::SimError;
use crate::net::{Demand, DemandId, LayerId, LinkId, NetAction, Network, NodeId};

struct Line {
    net: Network,
    layer: LayerId,
    a: NodeId,
    b: NodeId,
    c: NodeId,
    ab: LinkId,
    bc: LinkId,
    ac: DemandId,
}

/// a -> b -> c，一条 a 到 c 的业务
fn line() -> Line {
    let mut net = Network::default();
    let layer = net.add_layer("ip");
    let a = net.add_node("a");
    let b = net.add_node("b");
    let c = net.add_node("c");
    let ab = net.add_link(layer, a, b, 10.0).expect("link a->b");
    let bc = net.add_link(layer, b, c, 10.0).expect("link b->c");
    let ac = net.add_demand(layer, a, c, 4.0).expect("demand a->c");
    Line {
        net,
        layer,
        a,
        b,
        c,
        ab,
        bc,
        ac,
    }
}

#[test]
fn ids_are_unique_across_entity_kinds() {
    let l = line();
    let mut ids = vec![l.layer.0, l.a.0, l.b.0, l.c.0, l.ab.0, l.bc.0, l.ac.0];
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 7);
}

#[test]
fn removing_a_transit_node_drops_its_links_only() {
    let mut l = line();
    assert!(l.net.remove_node(l.b));
    assert!(!l.net.has_link(l.ab));
    assert!(!l.net.has_link(l.bc));
    assert!(l.net.has_demand(l.ac), "demand does not touch b");
    assert!(!l.net.remove_node(l.b), "second removal is a no-op");
}

#[test]
fn removing_an_endpoint_drops_its_demands() {
    let mut l = line();
    assert!(l.net.remove_node(l.a));
    assert!(!l.net.has_demand(l.ac));
    assert!(!l.net.has_link(l.ab));
    assert!(l.net.has_link(l.bc));
}

#[test]
fn removing_a_layer_keeps_nodes() {
    let mut l = line();
    assert!(l.net.remove_layer(l.layer));
    assert_eq!(l.net.num_layers(), 0);
    assert_eq!(l.net.num_nodes(), 3);
    assert_eq!(l.net.links().count(), 0);
    assert_eq!(l.net.demands().count(), 0);
}

#[test]
fn inserts_validate_references_and_duplicates() {
    let mut l = line();
    let dup = l.net.demand(l.ac).cloned().expect("demand exists");
    assert!(matches!(l.net.insert_demand(dup), Err(SimError::Scenario(_))));

    let dangling = Demand::new(DemandId(99), l.layer, l.a, NodeId(1234), 1.0);
    assert!(matches!(
        l.net.insert_demand(dangling),
        Err(SimError::Scenario(_))
    ));
    assert!(!l.net.has_demand(DemandId(99)));
    assert!(l.net.add_link(LayerId(777), l.a, l.b, 1.0).is_err());
}

#[test]
fn spec_conversion_preserves_the_network() {
    let l = line();
    let rebuilt = Network::from_spec(&l.net.to_spec()).expect("rebuild");
    assert_eq!(rebuilt.to_spec().links, l.net.to_spec().links);
    assert_eq!(rebuilt.num_nodes(), 3);
    assert!(rebuilt.has_demand(l.ac));
}

#[test]
fn per_layer_queries_and_usability() {
    let mut l = line();
    let incoming: Vec<LinkId> = l.net.incoming_links(l.b, l.layer).map(|x| x.id).collect();
    let outgoing: Vec<LinkId> = l.net.outgoing_links(l.b, l.layer).map(|x| x.id).collect();
    assert_eq!(incoming, vec![l.ab]);
    assert_eq!(outgoing, vec![l.bc]);

    assert!(l.net.is_link_usable(l.ab));
    l.net.set_node_up(l.b, false);
    assert!(!l.net.is_link_usable(l.ab), "endpoint down");
    assert!(l.net.link(l.ab).is_some_and(|x| x.up), "link flag itself untouched");
}

#[test]
fn zero_capacity_link_reports_zero_utilization() {
    let mut l = line();
    let link = l.net.link_mut(l.ab).expect("link");
    link.capacity = 0.0;
    link.occupied = 5.0;
    assert_eq!(link.utilization(), 0.0);
    assert_eq!(link.oversubscribed(), 5.0);
}

#[test]
fn actions_mutate_the_network() {
    let mut l = line();
    NetAction::FailLink { link: l.ab }
        .apply(&mut l.net)
        .expect("fail link");
    assert!(!l.net.link(l.ab).is_some_and(|x| x.up));

    NetAction::SetOfferedTraffic {
        demand: l.ac,
        traffic: 7.0,
    }
    .apply(&mut l.net)
    .expect("set traffic");
    assert_eq!(l.net.demand(l.ac).map(|d| d.offered), Some(7.0));

    NetAction::AddDemand {
        layer: l.layer,
        ingress: l.c,
        egress: l.a,
        offered: 1.0,
    }
    .apply(&mut l.net)
    .expect("add demand");
    assert_eq!(l.net.demands().count(), 2);

    let err = NetAction::RemoveDemand { demand: DemandId(4242) }
        .apply(&mut l.net)
        .expect_err("missing demand");
    assert!(matches!(err, SimError::Scenario(_)));
    assert!(
        NetAction::SetOfferedTraffic {
            demand: l.ac,
            traffic: -1.0
        }
        .apply(&mut l.net)
        .is_err()
    );
}

#[test]
fn actions_deserialize_from_tagged_json() {
    let a: NetAction =
        serde_json::from_str(r#"{ "kind": "set_capacity", "link": 3, "capacity": 2.5 }"#)
            .expect("parse action");
    assert_eq!(
        a,
        NetAction::SetCapacity {
            link: LinkId(3),
            capacity: 2.5
        }
    );
    assert_eq!(a.kind(), "set_capacity");
}

#[test]
fn added_demand_must_offer_finite_non_negative_traffic() {
    let mut l = line();
    for offered in [-5.0, f64::NAN, f64::INFINITY] {
        let err = NetAction::AddDemand {
            layer: l.layer,
            ingress: l.a,
            egress: l.c,
            offered,
        }
        .apply(&mut l.net)
        .expect_err("bad traffic");
        assert!(matches!(err, SimError::Scenario(_)), "{offered}");
    }
    assert_eq!(l.net.demands().count(), 1, "nothing was added");
}
