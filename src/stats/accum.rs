//! 时间加权累加器
//!
//! 每个值按其生效时长加权。未观测过的 min/max 保持哨兵值（±∞），报告时记为 0。

/// 时间加权的 avg/min/max 累加器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    /// 值对时间的积分
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    /// 累计观测时长
    pub time: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            time: 0.0,
        }
    }
}

impl Accumulator {
    /// 记录 `value` 持续了 `dt` 秒。`dt <= 0` 时不产生任何影响。
    pub fn observe(&mut self, value: f64, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        self.sum += value * dt;
        self.time += dt;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn is_observed(&self) -> bool {
        self.time > 0.0
    }

    pub fn avg(&self) -> f64 {
        ratio(self.sum, self.time)
    }

    pub fn min_or_zero(&self) -> f64 {
        if self.min.is_finite() { self.min } else { 0.0 }
    }

    pub fn max_or_zero(&self) -> f64 {
        if self.max.is_finite() { self.max } else { 0.0 }
    }
}

/// 某个布尔条件成立的时间占比
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeShare {
    pub on: f64,
    pub total: f64,
}

impl TimeShare {
    pub fn observe(&mut self, on: bool, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        self.total += dt;
        if on {
            self.on += dt;
        }
    }

    pub fn fraction(&self) -> f64 {
        ratio(self.on, self.total)
    }
}

/// 两个时间积分之比，例如承载流量 / 提供流量
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ratio {
    pub num: f64,
    pub den: f64,
}

impl Ratio {
    pub fn observe(&mut self, num: f64, den: f64, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        self.num += num * dt;
        self.den += den * dt;
    }

    pub fn value(&self) -> f64 {
        ratio(self.num, self.den)
    }
}

/// 最差值（最小值）折叠，用于“最差业务可用性”等
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Worst(f64);

impl Default for Worst {
    fn default() -> Self {
        Worst(f64::INFINITY)
    }
}

impl Worst {
    pub fn fold(&mut self, v: f64) {
        self.0 = self.0.min(v);
    }

    pub fn value_or_zero(&self) -> f64 {
        if self.0.is_finite() { self.0 } else { 0.0 }
    }
}

/// 分母为 0 时返回 0
pub fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

/// 在精度因子以内的数值噪声记为 0
pub fn floor_noise(v: f64, precision: f64) -> f64 {
    if v.abs() <= precision { 0.0 } else { v }
}
