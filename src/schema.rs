/// Column-name constants for IAMC-style timeseries data.
/// Single source of truth - exported to Python via PyO3.

// ── Scenario index columns ──────────────────────────────────────────────────
pub mod index {
    pub const MODEL: &str = "model";
    pub const SCENARIO: &str = "scenario";

    pub const ALL: [&str; 2] = [MODEL, SCENARIO];
}

// ── Timeseries data columns ─────────────────────────────────────────────────
pub mod data {
    pub const REGION: &str = "region";
    pub const VARIABLE: &str = "variable";
    pub const UNIT: &str = "unit";
    pub const YEAR: &str = "year";
    pub const VALUE: &str = "value";

    /// Every required column of the long format, in canonical order.
    pub const REQUIRED: [&str; 7] = [
        super::index::MODEL,
        super::index::SCENARIO,
        REGION,
        VARIABLE,
        UNIT,
        YEAR,
        VALUE,
    ];
}

/// Year written to reformatted output in place of the selected calendar year.
pub const REFERENCE_YEAR: i64 = 0;
