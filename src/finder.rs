use crate::models::{
    AffordabilityRecord, Config, ResidencyPreference, SelectedRecord, SizePreference,
};
use std::collections::{HashMap, HashSet};

/// The metric columns that survive the join. Everything else in the source
/// tables is dropped so the scoring surface stays fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    EarningsMedian,
    DebtDependent,
    DebtIndependent,
    TuitionInState,
    TuitionOutOfState,
    LoanAverage,
    FederalGrantAverage,
    InstitutionalGrantAverage,
    WorkStudyAverage,
    AffordabilityGap,
    Enrollment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
    Ignored,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::EarningsMedian,
        Metric::DebtDependent,
        Metric::DebtIndependent,
        Metric::TuitionInState,
        Metric::TuitionOutOfState,
        Metric::LoanAverage,
        Metric::FederalGrantAverage,
        Metric::InstitutionalGrantAverage,
        Metric::WorkStudyAverage,
        Metric::AffordabilityGap,
        Metric::Enrollment,
    ];

    /// Static domain knowledge: which way each metric points.
    /// Costs and debt count against a school, aid and earnings count for it.
    /// Enrollment is carried for display and size context, never scored.
    pub fn direction(self) -> Direction {
        match self {
            Metric::DebtDependent
            | Metric::DebtIndependent
            | Metric::TuitionInState
            | Metric::TuitionOutOfState
            | Metric::AffordabilityGap => Direction::LowerIsBetter,
            Metric::EarningsMedian
            | Metric::LoanAverage
            | Metric::FederalGrantAverage
            | Metric::InstitutionalGrantAverage
            | Metric::WorkStudyAverage => Direction::HigherIsBetter,
            Metric::Enrollment => Direction::Ignored,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::EarningsMedian => "Median Earnings (10y)",
            Metric::DebtDependent => "Median Debt (Dependent)",
            Metric::DebtIndependent => "Median Debt (Independent)",
            Metric::TuitionInState => "In-State Tuition",
            Metric::TuitionOutOfState => "Out-of-State Tuition",
            Metric::LoanAverage => "Average Loans Awarded",
            Metric::FederalGrantAverage => "Average Federal Grant Aid",
            Metric::InstitutionalGrantAverage => "Average Institutional Grant Aid",
            Metric::WorkStudyAverage => "Average Work Study Award",
            Metric::AffordabilityGap => "Affordability Gap",
            Metric::Enrollment => "Undergraduate Enrollment",
        }
    }
}

/// Importance weights per metric, 0 (ignored) to 5 (crucial). Built fresh
/// from the user's preferences for every scoring pass.
#[derive(Debug, Clone, Default)]
pub struct WeightConfig {
    pub weights: HashMap<Metric, u8>,
}

impl WeightConfig {
    pub fn from_config(config: &Config) -> Self {
        let mut weights = HashMap::new();

        for metric in [
            Metric::TuitionInState,
            Metric::TuitionOutOfState,
            Metric::AffordabilityGap,
        ] {
            weights.insert(metric, config.tuition_importance.min(5));
        }
        for metric in [Metric::DebtDependent, Metric::DebtIndependent] {
            weights.insert(metric, config.debt_importance.min(5));
        }
        for metric in [
            Metric::LoanAverage,
            Metric::FederalGrantAverage,
            Metric::InstitutionalGrantAverage,
            Metric::WorkStudyAverage,
        ] {
            weights.insert(metric, config.aid_importance.min(5));
        }
        weights.insert(Metric::EarningsMedian, config.earnings_importance.min(5));

        Self { weights }
    }

    pub fn weight(&self, metric: Metric) -> u8 {
        self.weights.get(&metric).copied().unwrap_or(0)
    }
}

/// One joined row for a surviving candidate. Raw values are kept for
/// display; the normalized copies in [0,1] feed the scoring pass.
#[derive(Debug, Clone)]
pub struct MergedCollege {
    pub unit_id: u32,
    pub name: String,
    pub state: String,
    pub msi_status: bool,
    pub enrollment: Option<u32>,
    pub raw: HashMap<Metric, f64>,
    pub normalized: HashMap<Metric, f64>,
}

#[derive(Debug, Clone)]
pub struct ScoredCollege {
    pub college: MergedCollege,
    pub score: f64,
}

/// Outcome of a recommendation pass. The two empty outcomes are distinct so
/// the caller can report why nothing came back.
#[derive(Debug, Clone)]
pub enum Recommendation {
    NoCandidates,
    NoJoinableRows,
    Ranked(Vec<ScoredCollege>),
}

#[derive(Debug, Clone)]
pub struct CollegeDetail {
    pub affordability: AffordabilityRecord,
    pub selected: SelectedRecord,
}

pub struct CollegeFinder<'a> {
    pub affordability: &'a [AffordabilityRecord],
    pub selected: &'a [SelectedRecord],
}

impl<'a> CollegeFinder<'a> {
    pub fn new(affordability: &'a [AffordabilityRecord], selected: &'a [SelectedRecord]) -> Self {
        Self {
            affordability,
            selected,
        }
    }

    /// Institutions matching the user's residency preference. A home state
    /// that matches nothing legitimately yields an empty set.
    pub fn filter_by_state(
        &self,
        home_state: &str,
        preference: ResidencyPreference,
    ) -> HashSet<u32> {
        match preference {
            ResidencyPreference::InState => self
                .affordability
                .iter()
                .filter(|r| r.state == home_state)
                .map(|r| r.unit_id)
                .collect(),
            ResidencyPreference::OutOfState => self
                .affordability
                .iter()
                .filter(|r| !r.state.is_empty() && r.state != home_state)
                .map(|r| r.unit_id)
                .collect(),
            ResidencyPreference::NoPreference => {
                self.affordability.iter().map(|r| r.unit_id).collect()
            }
        }
    }

    /// Institutions whose tuition falls inside the range, bounds inclusive.
    /// Which tuition column applies depends on the residency preference; with
    /// no preference, each school is checked against the column matching its
    /// actual relationship to the user's home state.
    pub fn filter_by_tuition(
        &self,
        range_thousands: (u32, u32),
        preference: ResidencyPreference,
        home_state: &str,
    ) -> HashSet<u32> {
        let lower = range_thousands.0 as f64 * 1000.0;
        let upper = range_thousands.1 as f64 * 1000.0;
        let within = |value: Option<f64>| match value {
            Some(v) => v >= lower && v <= upper,
            None => false,
        };

        match preference {
            ResidencyPreference::InState => self
                .selected
                .iter()
                .filter(|r| within(r.tuition_in_state))
                .map(|r| r.unit_id)
                .collect(),
            ResidencyPreference::OutOfState => self
                .selected
                .iter()
                .filter(|r| within(r.tuition_out_of_state))
                .map(|r| r.unit_id)
                .collect(),
            ResidencyPreference::NoPreference => {
                let home_ids: HashSet<u32> = self
                    .affordability
                    .iter()
                    .filter(|r| r.state == home_state)
                    .map(|r| r.unit_id)
                    .collect();
                let known_ids: HashSet<u32> =
                    self.affordability.iter().map(|r| r.unit_id).collect();

                self.selected
                    .iter()
                    .filter(|r| {
                        // Schools absent from the affordability table have no
                        // known state and cannot be placed on either side
                        if !known_ids.contains(&r.unit_id) {
                            return false;
                        }
                        if home_ids.contains(&r.unit_id) {
                            within(r.tuition_in_state)
                        } else {
                            within(r.tuition_out_of_state)
                        }
                    })
                    .map(|r| r.unit_id)
                    .collect()
            }
        }
    }

    /// Institutions whose dependent-student median debt falls inside the
    /// range, bounds inclusive. Schools without the metric match nothing.
    pub fn filter_by_debt(&self, range_thousands: (u32, u32)) -> HashSet<u32> {
        let lower = range_thousands.0 as f64 * 1000.0;
        let upper = range_thousands.1 as f64 * 1000.0;

        self.selected
            .iter()
            .filter(|r| match r.debt_dependent {
                Some(debt) => debt >= lower && debt <= upper,
                None => false,
            })
            .map(|r| r.unit_id)
            .collect()
    }

    /// When MSI is not required this is a no-op returning the full universe.
    pub fn filter_by_minority_serving(&self, require_msi: bool) -> HashSet<u32> {
        if !require_msi {
            return self.selected.iter().map(|r| r.unit_id).collect();
        }

        let msi_units: HashSet<u32> = self
            .affordability
            .iter()
            .filter(|r| r.msi_status)
            .map(|r| r.unit_id)
            .collect();

        self.selected
            .iter()
            .filter(|r| msi_units.contains(&r.unit_id))
            .map(|r| r.unit_id)
            .collect()
    }

    /// Institutions whose enrollment classifies into the preferred size.
    /// Schools without an enrollment count match no size class.
    pub fn filter_by_size(&self, size: SizePreference) -> HashSet<u32> {
        self.selected
            .iter()
            .filter(|r| r.size_class() == Some(size))
            .map(|r| r.unit_id)
            .collect()
    }

    /// Intersect the independent filter results into one candidate set.
    /// Intersection is commutative and associative, so filter order never
    /// changes the outcome; any empty input short-circuits to empty.
    pub fn resolve_candidates(filter_results: &[HashSet<u32>]) -> HashSet<u32> {
        let mut iter = filter_results.iter();
        let mut candidates = match iter.next() {
            Some(first) => first.clone(),
            None => return HashSet::new(),
        };

        for set in iter {
            candidates.retain(|id| set.contains(id));
            if candidates.is_empty() {
                break;
            }
        }

        candidates
    }

    /// Join both tables over the candidate set and min-max scale every
    /// metric against this subset. Missing values count as 0 before the
    /// min/max fit; a constant column (or a single-row subset) normalizes
    /// to 0 instead of dividing by zero.
    pub fn merge_and_normalize(&self, candidates: &HashSet<u32>) -> Vec<MergedCollege> {
        let affordability_by_id: HashMap<u32, &AffordabilityRecord> = self
            .affordability
            .iter()
            .map(|r| (r.unit_id, r))
            .collect();

        let mut merged = Vec::new();
        for sel in self.selected {
            if !candidates.contains(&sel.unit_id) {
                continue;
            }
            let aff = match affordability_by_id.get(&sel.unit_id) {
                Some(aff) => aff,
                None => continue,
            };

            merged.push(MergedCollege {
                unit_id: sel.unit_id,
                name: aff.name.clone(),
                state: aff.state.clone(),
                msi_status: aff.msi_status,
                enrollment: sel.enrollment,
                raw: metric_values(aff, sel),
                normalized: HashMap::new(),
            });
        }

        for metric in Metric::ALL {
            let values: Vec<f64> = merged
                .iter()
                .map(|m| m.raw.get(&metric).copied().unwrap_or(0.0))
                .collect();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            for (college, value) in merged.iter_mut().zip(values) {
                let normalized = if max > min {
                    (value - min) / (max - min)
                } else {
                    0.0
                };
                college.normalized.insert(metric, normalized);
            }
        }

        merged
    }

    /// Weighted composite score over the normalized metrics, then a stable
    /// descending sort. Lower-is-better metrics are flipped to 1 - value;
    /// weight 0 and ignored metrics contribute nothing. Campuses sharing a
    /// name collapse to their highest-scoring row.
    pub fn score_and_rank(
        merged: Vec<MergedCollege>,
        weights: &WeightConfig,
    ) -> Vec<ScoredCollege> {
        let mut scored: Vec<ScoredCollege> = merged
            .into_iter()
            .map(|college| {
                let mut score = 0.0;
                for metric in Metric::ALL {
                    let weight = weights.weight(metric);
                    if weight == 0 {
                        continue;
                    }
                    let value = college.normalized.get(&metric).copied().unwrap_or(0.0);
                    let adjusted = match metric.direction() {
                        Direction::HigherIsBetter => value,
                        Direction::LowerIsBetter => 1.0 - value,
                        Direction::Ignored => continue,
                    };
                    score += weight as f64 * adjusted;
                }
                ScoredCollege { college, score }
            })
            .collect();

        // sort_by is stable, so ties keep their join order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen_names = HashSet::new();
        scored.retain(|s| seen_names.insert(s.college.name.clone()));

        scored
    }

    /// Full pipeline: independent filters -> intersection -> join/normalize
    /// -> weighted ranking. Pure function of the tables and preferences.
    pub fn recommend(&self, config: &Config, weights: &WeightConfig) -> Recommendation {
        let filter_results = [
            self.filter_by_state(&config.home_state, config.residency_preference),
            self.filter_by_tuition(
                config.tuition_range,
                config.residency_preference,
                &config.home_state,
            ),
            self.filter_by_debt(config.debt_range),
            self.filter_by_minority_serving(config.require_msi),
            self.filter_by_size(config.size_preference),
        ];

        let candidates = Self::resolve_candidates(&filter_results);
        if candidates.is_empty() {
            return Recommendation::NoCandidates;
        }

        let merged = self.merge_and_normalize(&candidates);
        if merged.is_empty() {
            return Recommendation::NoJoinableRows;
        }

        Recommendation::Ranked(Self::score_and_rank(merged, weights))
    }

    /// Look up one institution's rows in both tables. Numeric input is
    /// treated as a Unit ID; anything else matches case-insensitively
    /// against institution names, taking the first hit when several share
    /// the text. A detail view needs both rows, so a school missing from
    /// either table reports as not found.
    pub fn find_detail(&self, selector: &str) -> Option<CollegeDetail> {
        let query = selector.trim();
        let affordability = match query.parse::<u32>() {
            Ok(unit_id) => self.affordability.iter().find(|r| r.unit_id == unit_id),
            Err(_) => {
                if query.is_empty() {
                    None
                } else {
                    let lowered = query.to_lowercase();
                    self.affordability
                        .iter()
                        .find(|r| r.name.to_lowercase().contains(&lowered))
                }
            }
        }?;

        let selected = self
            .selected
            .iter()
            .find(|r| r.unit_id == affordability.unit_id)?;

        Some(CollegeDetail {
            affordability: affordability.clone(),
            selected: selected.clone(),
        })
    }
}

/// Pick the fixed metric columns out of a joined pair of rows. Metrics the
/// source data lacks stay absent here and only become 0 at normalization.
fn metric_values(aff: &AffordabilityRecord, sel: &SelectedRecord) -> HashMap<Metric, f64> {
    let mut raw = HashMap::new();
    let mut put = |metric: Metric, value: Option<f64>| {
        if let Some(v) = value {
            raw.insert(metric, v);
        }
    };

    put(Metric::EarningsMedian, sel.earnings_median);
    put(Metric::DebtDependent, sel.debt_dependent);
    put(Metric::DebtIndependent, sel.debt_independent);
    put(Metric::TuitionInState, sel.tuition_in_state);
    put(Metric::TuitionOutOfState, sel.tuition_out_of_state);
    put(Metric::LoanAverage, sel.loan_average);
    put(Metric::FederalGrantAverage, sel.federal_grant_average);
    put(
        Metric::InstitutionalGrantAverage,
        sel.institutional_grant_average,
    );
    put(Metric::WorkStudyAverage, aff.work_study_average);
    put(Metric::AffordabilityGap, aff.affordability_gap);
    put(Metric::Enrollment, sel.enrollment.map(|e| e as f64));

    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aff(unit_id: u32, name: &str, state: &str, msi: bool) -> AffordabilityRecord {
        AffordabilityRecord {
            unit_id,
            name: name.to_string(),
            state: state.to_string(),
            msi_status: msi,
            msi_types: Vec::new(),
            work_study_average: None,
            affordability_gap: None,
        }
    }

    fn sel(unit_id: u32) -> SelectedRecord {
        SelectedRecord {
            unit_id,
            tuition_in_state: None,
            tuition_out_of_state: None,
            debt_dependent: None,
            debt_independent: None,
            earnings_median: None,
            enrollment: None,
            loan_average: None,
            federal_grant_average: None,
            institutional_grant_average: None,
            demographics: Vec::new(),
        }
    }

    fn ids(values: &[u32]) -> HashSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn intersection_is_commutative_and_associative() {
        let a = ids(&[1, 2, 3, 4]);
        let b = ids(&[2, 3, 4, 5]);
        let c = ids(&[3, 4, 5, 6]);

        let abc = CollegeFinder::resolve_candidates(&[a.clone(), b.clone(), c.clone()]);
        let cba = CollegeFinder::resolve_candidates(&[c.clone(), b.clone(), a.clone()]);
        let bac = CollegeFinder::resolve_candidates(&[b, a, c]);

        assert_eq!(abc, ids(&[3, 4]));
        assert_eq!(abc, cba);
        assert_eq!(abc, bac);
    }

    #[test]
    fn empty_filter_result_short_circuits_the_intersection() {
        let result =
            CollegeFinder::resolve_candidates(&[ids(&[1, 2]), HashSet::new(), ids(&[1, 2])]);
        assert!(result.is_empty());
    }

    #[test]
    fn in_state_filter_with_unknown_home_state_is_empty() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "NY", false)];
        let selected = vec![sel(1), sel(2)];
        let finder = CollegeFinder::new(&affordability, &selected);

        let result = finder.filter_by_state("ZZ", ResidencyPreference::InState);
        assert!(result.is_empty());
    }

    #[test]
    fn state_filter_splits_in_and_out_of_state() {
        let affordability = vec![
            aff(1, "A", "CA", false),
            aff(2, "B", "CA", false),
            aff(3, "C", "NY", false),
        ];
        let selected = vec![sel(1), sel(2), sel(3)];
        let finder = CollegeFinder::new(&affordability, &selected);

        assert_eq!(
            finder.filter_by_state("CA", ResidencyPreference::InState),
            ids(&[1, 2])
        );
        assert_eq!(
            finder.filter_by_state("CA", ResidencyPreference::OutOfState),
            ids(&[3])
        );
        assert_eq!(
            finder.filter_by_state("CA", ResidencyPreference::NoPreference),
            ids(&[1, 2, 3])
        );
    }

    #[test]
    fn tuition_filter_is_inclusive_at_both_bounds() {
        let affordability = vec![
            aff(1, "A", "CA", false),
            aff(2, "B", "CA", false),
            aff(3, "C", "CA", false),
            aff(4, "D", "CA", false),
        ];
        let mut s1 = sel(1);
        s1.tuition_in_state = Some(20000.0); // exactly lower * 1000
        let mut s2 = sel(2);
        s2.tuition_in_state = Some(75000.0); // exactly upper * 1000
        let mut s3 = sel(3);
        s3.tuition_in_state = Some(75000.01);
        let mut s4 = sel(4);
        s4.tuition_in_state = Some(19999.99);
        let selected = vec![s1, s2, s3, s4];
        let finder = CollegeFinder::new(&affordability, &selected);

        let result = finder.filter_by_tuition((20, 75), ResidencyPreference::InState, "CA");
        assert_eq!(result, ids(&[1, 2]));
    }

    #[test]
    fn no_preference_tuition_checks_the_column_matching_actual_residency() {
        let affordability = vec![aff(1, "Home U", "CA", false), aff(2, "Away U", "NY", false)];
        // Home school: cheap in-state, absurd out-of-state. Away school: the
        // reverse. Each must be judged by the column that applies to a CA
        // resident, so both pass.
        let mut home = sel(1);
        home.tuition_in_state = Some(10000.0);
        home.tuition_out_of_state = Some(99000.0);
        let mut away = sel(2);
        away.tuition_in_state = Some(99000.0);
        away.tuition_out_of_state = Some(12000.0);
        let selected = vec![home, away];
        let finder = CollegeFinder::new(&affordability, &selected);

        let result = finder.filter_by_tuition((5, 20), ResidencyPreference::NoPreference, "CA");
        assert_eq!(result, ids(&[1, 2]));
    }

    #[test]
    fn debt_filter_ignores_schools_without_the_metric() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut s1 = sel(1);
        s1.debt_dependent = Some(15000.0);
        let s2 = sel(2); // no debt data at all
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        assert_eq!(finder.filter_by_debt((10, 40)), ids(&[1]));
        // A dataset missing the column entirely yields an empty result
        let bare = vec![sel(3)];
        let finder = CollegeFinder::new(&affordability, &bare);
        assert!(finder.filter_by_debt((0, 100)).is_empty());
    }

    #[test]
    fn msi_filter_passes_everything_unless_required() {
        let affordability = vec![aff(1, "A", "CA", true), aff(2, "B", "CA", false)];
        let selected = vec![sel(1), sel(2)];
        let finder = CollegeFinder::new(&affordability, &selected);

        assert_eq!(finder.filter_by_minority_serving(false), ids(&[1, 2]));
        assert_eq!(finder.filter_by_minority_serving(true), ids(&[1]));
    }

    #[test]
    fn size_filter_matches_classification_and_skips_unknown_enrollment() {
        let affordability = vec![
            aff(1, "A", "CA", false),
            aff(2, "B", "CA", false),
            aff(3, "C", "CA", false),
            aff(4, "D", "CA", false),
        ];
        let mut small = sel(1);
        small.enrollment = Some(5000);
        let mut medium = sel(2);
        medium.enrollment = Some(5001);
        let mut large = sel(3);
        large.enrollment = Some(15001);
        let unknown = sel(4);
        let selected = vec![small, medium, large, unknown];
        let finder = CollegeFinder::new(&affordability, &selected);

        assert_eq!(finder.filter_by_size(SizePreference::Small), ids(&[1]));
        assert_eq!(finder.filter_by_size(SizePreference::Medium), ids(&[2]));
        assert_eq!(finder.filter_by_size(SizePreference::Large), ids(&[3]));
    }

    #[test]
    fn normalization_hits_zero_and_one_at_the_extremes_and_is_monotonic() {
        let affordability = vec![
            aff(1, "A", "CA", false),
            aff(2, "B", "CA", false),
            aff(3, "C", "CA", false),
        ];
        let mut s1 = sel(1);
        s1.earnings_median = Some(30000.0);
        let mut s2 = sel(2);
        s2.earnings_median = Some(45000.0);
        let mut s3 = sel(3);
        s3.earnings_median = Some(60000.0);
        let selected = vec![s1, s2, s3];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2, 3]));
        let norm = |unit_id: u32| {
            merged
                .iter()
                .find(|m| m.unit_id == unit_id)
                .unwrap()
                .normalized[&Metric::EarningsMedian]
        };

        assert_eq!(norm(1), 0.0);
        assert_eq!(norm(3), 1.0);
        assert!(norm(1) < norm(2) && norm(2) < norm(3));
        assert!((norm(2) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_values_count_as_zero_before_the_min_max_fit() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut s1 = sel(1);
        s1.earnings_median = Some(40000.0);
        let s2 = sel(2); // earnings missing -> treated as 0 in the fit
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2]));
        let by_id: HashMap<u32, &MergedCollege> =
            merged.iter().map(|m| (m.unit_id, m)).collect();

        assert_eq!(by_id[&1].normalized[&Metric::EarningsMedian], 1.0);
        assert_eq!(by_id[&2].normalized[&Metric::EarningsMedian], 0.0);
    }

    #[test]
    fn constant_columns_and_singleton_subsets_normalize_to_zero() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut s1 = sel(1);
        s1.debt_dependent = Some(20000.0);
        let mut s2 = sel(2);
        s2.debt_dependent = Some(20000.0);
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2]));
        for college in &merged {
            let value = college.normalized[&Metric::DebtDependent];
            assert_eq!(value, 0.0);
            assert!(value.is_finite());
        }

        let alone = finder.merge_and_normalize(&ids(&[1]));
        assert_eq!(alone.len(), 1);
        assert_eq!(alone[0].normalized[&Metric::DebtDependent], 0.0);
    }

    #[test]
    fn higher_is_better_metric_raises_the_score_of_the_higher_value() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut s1 = sel(1);
        s1.earnings_median = Some(60000.0);
        let mut s2 = sel(2);
        s2.earnings_median = Some(30000.0);
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2]));
        let mut weights = WeightConfig::default();
        weights.weights.insert(Metric::EarningsMedian, 4);

        let ranked = CollegeFinder::score_and_rank(merged, &weights);
        assert_eq!(ranked[0].college.unit_id, 1);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn lower_is_better_metric_raises_the_score_of_the_lower_value() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut s1 = sel(1);
        s1.debt_dependent = Some(10000.0);
        let mut s2 = sel(2);
        s2.debt_dependent = Some(30000.0);
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2]));
        let mut weights = WeightConfig::default();
        weights.weights.insert(Metric::DebtDependent, 2);

        let ranked = CollegeFinder::score_and_rank(merged, &weights);
        assert_eq!(ranked[0].college.unit_id, 1);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ignored_direction_contributes_nothing_even_when_weighted() {
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut s1 = sel(1);
        s1.enrollment = Some(30000);
        let mut s2 = sel(2);
        s2.enrollment = Some(1000);
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2]));
        let mut weights = WeightConfig::default();
        weights.weights.insert(Metric::Enrollment, 5);

        let ranked = CollegeFinder::score_and_rank(merged, &weights);
        assert_eq!(ranked[0].score, 0.0);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn duplicate_names_keep_only_the_higher_scoring_row() {
        let affordability = vec![
            aff(1, "State University", "CA", false),
            aff(2, "State University", "CA", false),
            aff(3, "Other College", "CA", false),
        ];
        let mut s1 = sel(1);
        s1.earnings_median = Some(60000.0);
        let mut s2 = sel(2);
        s2.earnings_median = Some(20000.0);
        let mut s3 = sel(3);
        s3.earnings_median = Some(40000.0);
        let selected = vec![s1, s2, s3];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2, 3]));
        let mut weights = WeightConfig::default();
        weights.weights.insert(Metric::EarningsMedian, 3);

        let ranked = CollegeFinder::score_and_rank(merged, &weights);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].college.unit_id, 1);
        assert!(ranked.iter().all(|s| s.college.unit_id != 2));
    }

    #[test]
    fn end_to_end_scoring_scenario_ranks_the_cheap_school_first() {
        // A: tuition 20000, debt 10000, earnings 50000
        // B: tuition 40000, debt 20000, earnings 60000
        // weights: tuition 5 (lower), debt 0, earnings 3 (higher)
        // => A = 5*(1-0) + 3*0 = 5, B = 5*(1-1) + 3*1 = 3
        let affordability = vec![aff(1, "A", "CA", false), aff(2, "B", "CA", false)];
        let mut a = sel(1);
        a.tuition_in_state = Some(20000.0);
        a.debt_dependent = Some(10000.0);
        a.earnings_median = Some(50000.0);
        let mut b = sel(2);
        b.tuition_in_state = Some(40000.0);
        b.debt_dependent = Some(20000.0);
        b.earnings_median = Some(60000.0);
        let selected = vec![a, b];
        let finder = CollegeFinder::new(&affordability, &selected);

        let merged = finder.merge_and_normalize(&ids(&[1, 2]));
        let mut weights = WeightConfig::default();
        weights.weights.insert(Metric::TuitionInState, 5);
        weights.weights.insert(Metric::DebtDependent, 0);
        weights.weights.insert(Metric::EarningsMedian, 3);

        let ranked = CollegeFinder::score_and_rank(merged, &weights);
        assert_eq!(ranked[0].college.name, "A");
        assert_eq!(ranked[0].score, 5.0);
        assert_eq!(ranked[1].college.name, "B");
        assert_eq!(ranked[1].score, 3.0);
    }

    #[test]
    fn empty_candidate_set_reports_no_candidates_without_scoring() {
        let affordability = vec![aff(1, "A", "CA", false)];
        let mut s1 = sel(1);
        s1.tuition_in_state = Some(30000.0);
        s1.debt_dependent = Some(15000.0);
        s1.enrollment = Some(10000);
        let selected = vec![s1];
        let finder = CollegeFinder::new(&affordability, &selected);

        let mut config = Config::default();
        config.home_state = "CA".to_string();
        config.require_msi = true; // nothing is an MSI here
        let weights = WeightConfig::from_config(&config);

        match finder.recommend(&config, &weights) {
            Recommendation::NoCandidates => {}
            other => panic!("expected NoCandidates, got {:?}", other),
        }
    }

    #[test]
    fn unjoinable_candidates_merge_to_nothing() {
        let affordability = vec![aff(1, "A", "CA", false)];
        let selected = vec![sel(1)];
        let finder = CollegeFinder::new(&affordability, &selected);

        // Candidate id exists in neither table's join overlap
        let merged = finder.merge_and_normalize(&ids(&[99]));
        assert!(merged.is_empty());
    }

    #[test]
    fn recommend_runs_the_whole_pipeline() {
        let affordability = vec![aff(1, "Home U", "CA", false), aff(2, "Away U", "NY", false)];
        let mut s1 = sel(1);
        s1.tuition_in_state = Some(25000.0);
        s1.debt_dependent = Some(15000.0);
        s1.earnings_median = Some(50000.0);
        s1.enrollment = Some(10000);
        let mut s2 = sel(2);
        s2.tuition_out_of_state = Some(30000.0);
        s2.debt_dependent = Some(20000.0);
        s2.earnings_median = Some(55000.0);
        s2.enrollment = Some(12000);
        let selected = vec![s1, s2];
        let finder = CollegeFinder::new(&affordability, &selected);

        let mut config = Config::default();
        config.home_state = "CA".to_string();
        let weights = WeightConfig::from_config(&config);

        match finder.recommend(&config, &weights) {
            Recommendation::Ranked(ranked) => {
                assert_eq!(ranked.len(), 2);
                assert!(ranked[0].score >= ranked[1].score);
            }
            other => panic!("expected a ranking, got {:?}", other),
        }
    }

    #[test]
    fn weights_built_from_config_clamp_to_five_and_cover_metric_groups() {
        let mut config = Config::default();
        config.tuition_importance = 9;
        config.debt_importance = 2;
        config.aid_importance = 0;
        let weights = WeightConfig::from_config(&config);

        assert_eq!(weights.weight(Metric::TuitionInState), 5);
        assert_eq!(weights.weight(Metric::TuitionOutOfState), 5);
        assert_eq!(weights.weight(Metric::AffordabilityGap), 5);
        assert_eq!(weights.weight(Metric::DebtDependent), 2);
        assert_eq!(weights.weight(Metric::DebtIndependent), 2);
        assert_eq!(weights.weight(Metric::LoanAverage), 0);
        assert_eq!(weights.weight(Metric::EarningsMedian), 3);
        // Enrollment never receives a weight from preferences
        assert_eq!(weights.weight(Metric::Enrollment), 0);
    }

    #[test]
    fn detail_lookup_by_id_name_and_absence() {
        let affordability = vec![
            aff(10, "Central State University", "OH", true),
            aff(11, "Central Community College", "OH", false),
        ];
        let selected = vec![sel(10)];
        let finder = CollegeFinder::new(&affordability, &selected);

        let by_id = finder.find_detail("10").unwrap();
        assert_eq!(by_id.affordability.unit_id, 10);

        // Name matching is case-insensitive substring, first match wins
        let by_name = finder.find_detail("central").unwrap();
        assert_eq!(by_name.affordability.unit_id, 10);

        // Present in the affordability table but not the selected table
        assert!(finder.find_detail("11").is_none());
        assert!(finder.find_detail("Community").is_none());
        // No match at all
        assert!(finder.find_detail("Nowhere Tech").is_none());
        assert!(finder.find_detail("").is_none());
    }
}
