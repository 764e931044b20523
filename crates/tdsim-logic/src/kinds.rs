//! Type keys shared by catalogs, waves and the purchase policy.
//!
//! Catalogs are keyed by plain strings so scenarios can be loaded from data
//! files. These are the keys the built-in wave generator and purchase rules
//! refer to.

pub mod towers {
    pub const BASIC: &str = "basic";
    pub const SLOW: &str = "slow";
    pub const SPLASH: &str = "splash";
    pub const SNIPER: &str = "sniper";
}

pub mod enemies {
    pub const BASIC: &str = "basic";
    pub const FAST: &str = "fast";
    pub const TANK: &str = "tank";
    pub const BOSS: &str = "boss";

    /// Every kind the wave generator can emit.
    pub const ALL: [&str; 4] = [BASIC, FAST, TANK, BOSS];
}
