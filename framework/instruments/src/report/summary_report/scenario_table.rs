use tabled::Tabled;

#[derive(Tabled)]
pub struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    pub scenario: String,
    #[tabled(rename = "Runs")]
    pub count: usize,
    #[tabled(rename = "Mean (ms)", display = "float3")]
    pub mean_ms: f64,
    #[tabled(rename = "Median (ms)", display = "float3")]
    pub median_ms: f64,
    #[tabled(rename = "Min (ms)", display = "float3")]
    pub min_ms: f64,
    #[tabled(rename = "Max (ms)", display = "float3")]
    pub max_ms: f64,
    #[tabled(rename = "Std dev (ms)", display = "float3")]
    pub std_dev_ms: f64,
    #[tabled(rename = "P90 (ms)", display = "float3")]
    pub p90_ms: f64,
    #[tabled(rename = "P95 (ms)", display = "float3")]
    pub p95_ms: f64,
    #[tabled(rename = "P99 (ms)", display = "float3")]
    pub p99_ms: f64,
    #[tabled(rename = "User (ms)", display = "float3")]
    pub user_mean_ms: f64,
    #[tabled(rename = "System (ms)", display = "float3")]
    pub system_mean_ms: f64,
    #[tabled(rename = "Errors", display = "percent")]
    pub error_rate: f64,
}

fn float3(n: &f64) -> String {
    format!("{:.3}", n)
}

fn percent(n: &f64) -> String {
    format!("{:.1}%", n * 100.0)
}
