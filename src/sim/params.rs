//! 仿真参数
//!
//! 参数以字符串键值对形式给出，在仿真开始前统一校验。
//! `-1` 表示“不限制/不启用”。

use super::time::SimTime;
use crate::error::ConfigError;
use std::collections::BTreeMap;

/// 字符串键值参数表
pub type ParamMap = BTreeMap<String, String>;

pub const DISABLE_STATISTICS: &str = "disableStatistics";
pub const REFRESH_TIME: &str = "refreshTime";
pub const SIM_EVENTS: &str = "simEvents";
pub const TRANSITORY_EVENTS: &str = "transitoryEvents";
pub const SIM_TIME: &str = "simTime";
pub const TRANSITORY_TIME: &str = "transitoryTime";

/// 全局参数：数值噪声容差
pub const PRECISION_FACTOR: &str = "precisionFactor";
pub const DEFAULT_PRECISION_FACTOR: f64 = 1e-3;

/// 校验后的仿真参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub disable_statistics: bool,
    /// 刷新间隔（CPU 秒）；`f64::INFINITY` 表示从不刷新
    pub refresh_time: f64,
    pub sim_events: Option<u64>,
    pub transitory_events: Option<u64>,
    pub sim_time: Option<SimTime>,
    pub transitory_time: Option<SimTime>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            disable_statistics: false,
            refresh_time: 60.0,
            sim_events: None,
            transitory_events: None,
            sim_time: None,
            transitory_time: None,
        }
    }
}

impl SimParams {
    /// 默认参数表（所有必需键齐全）
    pub fn default_map() -> ParamMap {
        [
            (DISABLE_STATISTICS, "false"),
            (REFRESH_TIME, "60"),
            (SIM_EVENTS, "-1"),
            (TRANSITORY_EVENTS, "-1"),
            (SIM_TIME, "-1"),
            (TRANSITORY_TIME, "-1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// 从参数表解析并校验；缺少任何必需键都会失败
    pub fn from_map(map: &ParamMap) -> Result<Self, ConfigError> {
        let refresh_time = parse_f64(map, REFRESH_TIME)?;
        if refresh_time.is_nan() || refresh_time < 0.0 {
            return Err(invalid(map, REFRESH_TIME, "must be >= 0"));
        }
        Ok(Self {
            disable_statistics: parse_bool(map, DISABLE_STATISTICS)?,
            refresh_time,
            sim_events: parse_limit_count(map, SIM_EVENTS)?,
            transitory_events: parse_limit_count(map, TRANSITORY_EVENTS)?,
            sim_time: parse_limit_time(map, SIM_TIME)?,
            transitory_time: parse_limit_time(map, TRANSITORY_TIME)?,
        })
    }

    /// 反向生成参数表（传给模块的 `initialize`）
    pub fn to_map(&self) -> ParamMap {
        let count = |v: Option<u64>| v.map_or("-1".to_string(), |n| n.to_string());
        let time = |v: Option<SimTime>| v.map_or("-1".to_string(), |t| t.0.to_string());
        let mut map = ParamMap::new();
        map.insert(DISABLE_STATISTICS.into(), self.disable_statistics.to_string());
        map.insert(REFRESH_TIME.into(), self.refresh_time.to_string());
        map.insert(SIM_EVENTS.into(), count(self.sim_events));
        map.insert(TRANSITORY_EVENTS.into(), count(self.transitory_events));
        map.insert(SIM_TIME.into(), time(self.sim_time));
        map.insert(TRANSITORY_TIME.into(), time(self.transitory_time));
        map
    }
}

/// 从全局参数中读取精度因子（缺省 1e-3）
pub fn precision_factor(global: &ParamMap) -> Result<f64, ConfigError> {
    match global.get(PRECISION_FACTOR) {
        None => Ok(DEFAULT_PRECISION_FACTOR),
        Some(_) => {
            let v = parse_f64(global, PRECISION_FACTOR)?;
            if !(v >= 0.0 && v.is_finite()) {
                return Err(invalid(global, PRECISION_FACTOR, "must be a finite value >= 0"));
            }
            Ok(v)
        }
    }
}

fn raw<'a>(map: &'a ParamMap, key: &str) -> Result<&'a str, ConfigError> {
    map.get(key)
        .map(|s| s.trim())
        .ok_or_else(|| ConfigError::MissingParam(key.to_string()))
}

fn invalid(map: &ParamMap, key: &str, why: &str) -> ConfigError {
    ConfigError::InvalidParam {
        key: key.to_string(),
        value: map.get(key).cloned().unwrap_or_default(),
        why: why.to_string(),
    }
}

fn parse_bool(map: &ParamMap, key: &str) -> Result<bool, ConfigError> {
    match raw(map, key)?.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(map, key, "expected a boolean")),
    }
}

fn parse_f64(map: &ParamMap, key: &str) -> Result<f64, ConfigError> {
    raw(map, key)?
        .parse::<f64>()
        .map_err(|_| invalid(map, key, "expected a number"))
}

fn parse_limit_count(map: &ParamMap, key: &str) -> Result<Option<u64>, ConfigError> {
    let v = raw(map, key)?
        .parse::<i64>()
        .map_err(|_| invalid(map, key, "expected an integer"))?;
    match v {
        -1 => Ok(None),
        n if n >= 0 => Ok(Some(n as u64)),
        _ => Err(invalid(map, key, "must be -1 or >= 0")),
    }
}

fn parse_limit_time(map: &ParamMap, key: &str) -> Result<Option<SimTime>, ConfigError> {
    let v = parse_f64(map, key)?;
    if v == -1.0 {
        Ok(None)
    } else if v >= 0.0 && v.is_finite() {
        Ok(Some(SimTime(v)))
    } else {
        Err(invalid(map, key, "must be -1 or a finite value >= 0"))
    }
}
