use crate::stats::Stats;
use crate::trace::{ScenarioId, Trace};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// The three timing views of one scenario. They are built from the same traces, so they always
/// share the same count.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioStats {
    perceived: Stats,
    user: Stats,
    system: Stats,
}

impl ScenarioStats {
    fn from_traces(traces: &[Trace]) -> Self {
        let error_count = traces.iter().filter(|trace| trace.is_error()).count();

        Self {
            perceived: Stats::new(traces.iter().map(Trace::perceived).collect(), error_count),
            user: Stats::new(traces.iter().map(Trace::user).collect(), 0),
            system: Stats::new(traces.iter().map(Trace::system).collect(), 0),
        }
    }

    /// Wall-clock time. This is the view that carries the error rate.
    pub fn perceived(&self) -> &Stats {
        &self.perceived
    }

    pub fn user(&self) -> &Stats {
        &self.user
    }

    pub fn system(&self) -> &Stats {
        &self.system
    }
}

/// A frozen snapshot of every trace accumulated up to the moment it was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    captured_at: DateTime<Utc>,
    ids: Vec<ScenarioId>,
    stats: HashMap<ScenarioId, ScenarioStats>,
}

impl Summary {
    /// Build a summary from traces grouped by scenario. `ids` gives the reporting order and must
    /// contain every key of `traces`.
    pub(crate) fn new(
        captured_at: DateTime<Utc>,
        ids: &[ScenarioId],
        traces: &HashMap<ScenarioId, Vec<Trace>>,
    ) -> Self {
        let stats = ids
            .iter()
            .filter_map(|id| {
                traces
                    .get(id)
                    .map(|traces| (id.clone(), ScenarioStats::from_traces(traces)))
            })
            .collect::<HashMap<_, _>>();

        Self {
            captured_at,
            ids: ids
                .iter()
                .filter(|id| stats.contains_key(*id))
                .cloned()
                .collect(),
            stats,
        }
    }

    /// Summarise a list of traces directly, grouping them by scenario in order of first
    /// appearance.
    pub fn from_traces(traces: impl IntoIterator<Item = Trace>) -> Self {
        let mut ids = Vec::new();
        let mut grouped: HashMap<ScenarioId, Vec<Trace>> = HashMap::new();
        for trace in traces {
            match grouped.entry(trace.id().to_string()) {
                std::collections::hash_map::Entry::Vacant(entry) => {
                    ids.push(entry.key().clone());
                    entry.insert(vec![trace]);
                }
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    entry.get_mut().push(trace);
                }
            }
        }

        Self::new(Utc::now(), &ids, &grouped)
    }

    /// When the newest trace included in this summary was accumulated, or when the sink was
    /// created if it has seen no traces.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Scenario ids in the order their first trace arrived.
    pub fn ids(&self) -> &[ScenarioId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ScenarioStats> {
        self.stats.get(id)
    }

    pub fn perceived_time_stats(&self, id: &str) -> Option<&Stats> {
        self.get(id).map(ScenarioStats::perceived)
    }

    pub fn user_time_stats(&self, id: &str) -> Option<&Stats> {
        self.get(id).map(ScenarioStats::user)
    }

    pub fn system_time_stats(&self, id: &str) -> Option<&Stats> {
        self.get(id).map(ScenarioStats::system)
    }

    /// All scenarios with their statistics, in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScenarioStats)> {
        self.ids
            .iter()
            .filter_map(|id| self.stats.get(id).map(|stats| (id.as_str(), stats)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn trace(id: &str, millis: u64, failed: bool) -> Trace {
        Trace::new(
            id,
            Duration::from_millis(millis),
            Duration::from_millis(millis / 2),
            Duration::from_millis(millis / 4),
            failed.then(|| Arc::new(anyhow::anyhow!("failed"))),
        )
    }

    #[test]
    fn groups_by_id_in_arrival_order() {
        let summary = Summary::from_traces(vec![
            trace("b", 10, false),
            trace("a", 20, false),
            trace("b", 30, true),
        ]);

        assert_eq!(&["b".to_string(), "a".to_string()], summary.ids());
        assert_eq!(2, summary.perceived_time_stats("b").unwrap().count());
        assert_eq!(1, summary.perceived_time_stats("a").unwrap().count());
        assert!(summary.get("c").is_none());
    }

    #[test]
    fn views_share_count_and_errors_live_on_perceived() {
        let summary = Summary::from_traces(vec![trace("a", 8, true), trace("a", 16, false)]);
        let stats = summary.get("a").unwrap();

        assert_eq!(stats.perceived().count(), stats.user().count());
        assert_eq!(stats.perceived().count(), stats.system().count());
        assert_eq!(0.5, stats.perceived().error_rate());
        assert_eq!(0.0, stats.user().error_rate());
        assert_eq!(Duration::from_millis(12), stats.perceived().mean().unwrap());
        assert_eq!(Duration::from_millis(6), stats.user().mean().unwrap());
        assert_eq!(Duration::from_millis(3), stats.system().mean().unwrap());
    }

    #[test]
    fn ten_traces_with_one_error() {
        let traces = (0..10).map(|i| trace("a", 10 + i, i == 3));
        let summary = Summary::from_traces(traces);

        assert_eq!(0.1, summary.perceived_time_stats("a").unwrap().error_rate());
    }

    #[test]
    fn empty_summary() {
        let summary = Summary::from_traces(Vec::new());
        assert!(summary.is_empty());
        assert_eq!(0, summary.iter().count());
    }
}
