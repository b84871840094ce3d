//! Cascading filter selection.
//!
//! A [`Hierarchy`] is an ordered list of filter levels, each with a static
//! option source that may depend on values chosen at earlier levels. A
//! [`FilterSelection`] is a partial assignment of values to those levels that
//! always forms a valid path: every set level has all of its ancestors either
//! set or auto-skipped (no options available), and changing a level drops
//! everything below it.

use crate::catalog::LEGACY_BROWSE;
use std::collections::BTreeMap;

/// Placeholder option for levels that accept a free-text value.
pub const OTHER_OPTION: &str = "Other";

// ============================================================================
// Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterLevel {
    State,
    InstitutionType,
    Institution,
    Field,
    Course,
    Semester,
    Subject,
}

impl FilterLevel {
    pub const ALL: [FilterLevel; 7] = [
        FilterLevel::State,
        FilterLevel::InstitutionType,
        FilterLevel::Institution,
        FilterLevel::Field,
        FilterLevel::Course,
        FilterLevel::Semester,
        FilterLevel::Subject,
    ];

    /// Query-string / form key, also used by the backend.
    pub fn key(self) -> &'static str {
        match self {
            FilterLevel::State => "state",
            FilterLevel::InstitutionType => "institution_type",
            FilterLevel::Institution => "institution",
            FilterLevel::Field => "field",
            FilterLevel::Course => "course",
            FilterLevel::Semester => "semester",
            FilterLevel::Subject => "subject",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterLevel::State => "State",
            FilterLevel::InstitutionType => "Institution Type",
            FilterLevel::Institution => "Institution Name",
            FilterLevel::Field => "Field / Class",
            FilterLevel::Course => "Course / Degree",
            FilterLevel::Semester => "Semester",
            FilterLevel::Subject => "Subject",
        }
    }

    /// Heading shown above a selection grid for this level.
    pub fn prompt(self) -> String {
        format!("Select {}", self.label())
    }

    /// Form key for the free-text value that replaces [`OTHER_OPTION`].
    pub fn other_key(self) -> String {
        format!("other_{}", self.key())
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

#[derive(Debug, PartialEq)]
pub enum OptionSource {
    Fixed(&'static [&'static str]),
    /// Options keyed by the values of `keys` (joined with `/`, unset keys
    /// skipped).
    Lookup {
        keys: &'static [FilterLevel],
        table: &'static [(&'static str, &'static [&'static str])],
    },
    /// Options `1..=n` where `n` is looked up by the value of `key`.
    Count {
        key: FilterLevel,
        table: &'static [(&'static str, u8)],
    },
}

#[derive(Debug, PartialEq)]
pub struct LevelSpec {
    pub level: FilterLevel,
    pub source: OptionSource,
    pub allows_other: bool,
}

#[derive(Debug, PartialEq)]
pub struct Hierarchy {
    pub name: &'static str,
    pub levels: &'static [LevelSpec],
}

/// The next level the user has to pick, with its resolved options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStep {
    pub level: FilterLevel,
    pub options: Vec<String>,
    pub allows_other: bool,
}

impl Hierarchy {
    pub fn position(&self, level: FilterLevel) -> Option<usize> {
        self.levels.iter().position(|spec| spec.level == level)
    }

    pub fn contains(&self, level: FilterLevel) -> bool {
        self.position(level).is_some()
    }

    /// Resolve the options of the level at `idx` from the ancestor values in
    /// `values`. Values at `idx` or below are never consulted.
    fn options_at(&self, idx: usize, values: &BTreeMap<FilterLevel, String>) -> Vec<String> {
        let ancestors = &self.levels[..idx];

        match &self.levels[idx].source {
            OptionSource::Fixed(list) => list.iter().map(|s| s.to_string()).collect(),
            OptionSource::Lookup { keys, table } => {
                let parts: Vec<&str> = keys
                    .iter()
                    .filter_map(|k| ancestor_value(ancestors, values, *k))
                    .collect();
                if parts.is_empty() {
                    return Vec::new();
                }
                let key = parts.join("/");
                table
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, list)| list.iter().map(|s| s.to_string()).collect())
                    .unwrap_or_default()
            }
            OptionSource::Count { key, table } => {
                let count = ancestor_value(ancestors, values, *key)
                    .and_then(|v| table.iter().find(|(k, _)| *k == v))
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (1..=count).map(|n| n.to_string()).collect()
            }
        }
    }

    /// A level is satisfied once chosen. A level with nothing to offer is
    /// skipped, except one that accepts "Other", which always offers that.
    fn is_satisfied(&self, idx: usize, values: &BTreeMap<FilterLevel, String>) -> bool {
        let spec = &self.levels[idx];
        values.contains_key(&spec.level)
            || (!spec.allows_other && self.options_at(idx, values).is_empty())
    }

    /// First level that is neither selected nor auto-skipped, or `None` when
    /// the selection is complete.
    pub fn next_step(&self, selection: &FilterSelection) -> Option<NextStep> {
        (0..self.levels.len())
            .find(|&idx| !self.is_satisfied(idx, &selection.values))
            .map(|idx| NextStep {
                level: self.levels[idx].level,
                options: self.options_at(idx, &selection.values),
                allows_other: self.levels[idx].allows_other,
            })
    }

    /// Options currently offered at `level`, regardless of whether it is set.
    pub fn options_for(&self, selection: &FilterSelection, level: FilterLevel) -> Vec<String> {
        self.position(level)
            .map(|idx| self.options_at(idx, &selection.values))
            .unwrap_or_default()
    }

    pub fn allows_other(&self, level: FilterLevel) -> bool {
        self.position(level)
            .is_some_and(|idx| self.levels[idx].allows_other)
    }
}

fn ancestor_value<'v>(
    ancestors: &[LevelSpec],
    values: &'v BTreeMap<FilterLevel, String>,
    level: FilterLevel,
) -> Option<&'v str> {
    if ancestors.iter().any(|spec| spec.level == level) {
        values.get(&level).map(String::as_str)
    } else {
        None
    }
}

// ============================================================================
// Selection
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelection {
    hierarchy: &'static Hierarchy,
    values: BTreeMap<FilterLevel, String>,
}

impl FilterSelection {
    pub fn new(hierarchy: &'static Hierarchy) -> Self {
        Self {
            hierarchy,
            values: BTreeMap::new(),
        }
    }

    /// Rebuild a selection from request parameters, applying levels in
    /// hierarchy order so an inconsistent query collapses to a valid path.
    pub fn from_params<'a, I>(hierarchy: &'static Hierarchy, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let given: BTreeMap<FilterLevel, &str> = params
            .into_iter()
            .filter_map(|(k, v)| FilterLevel::from_key(k).map(|level| (level, v)))
            .collect();

        hierarchy
            .levels
            .iter()
            .fold(Self::new(hierarchy), |selection, spec| match given.get(&spec.level) {
                Some(value) => selection.apply(spec.level, value),
                None => selection,
            })
    }

    /// [`from_params`](Self::from_params) for a submitted cascading form. The
    /// `changed` field names the select the user just edited; that level is
    /// re-applied so every level below it is dropped.
    pub fn from_form(hierarchy: &'static Hierarchy, params: &[(String, String)]) -> Self {
        let selection =
            Self::from_params(hierarchy, params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let changed = params
            .iter()
            .find(|(k, _)| k == "changed")
            .and_then(|(_, v)| FilterLevel::from_key(v));
        let Some(level) = changed else {
            return selection;
        };

        match params.iter().find(|(k, _)| k == level.key()) {
            Some((_, value)) => selection.apply(level, value),
            None => selection,
        }
    }

    pub fn hierarchy(&self) -> &'static Hierarchy {
        self.hierarchy
    }

    pub fn get(&self, level: FilterLevel) -> Option<&str> {
        self.values.get(&level).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn next_step(&self) -> Option<NextStep> {
        self.hierarchy.next_step(self)
    }

    pub fn is_complete(&self) -> bool {
        self.next_step().is_none()
    }

    /// Selected `(key, value)` pairs in hierarchy order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        self.hierarchy
            .levels
            .iter()
            .filter_map(|spec| self.get(spec.level).map(|v| (spec.level.key(), v)))
            .collect()
    }

    /// Return a copy with `level` set to `value` and every level below it
    /// cleared. An empty value only clears. Levels outside the hierarchy,
    /// levels whose ancestors are not yet satisfied, and values the level does
    /// not offer leave the selection unchanged.
    pub fn apply(&self, level: FilterLevel, value: &str) -> Self {
        let Some(idx) = self.hierarchy.position(level) else {
            return self.clone();
        };

        if !(0..idx).all(|i| self.hierarchy.is_satisfied(i, &self.values)) {
            return self.clone();
        }

        let mut values = self.values.clone();
        for spec in &self.hierarchy.levels[idx..] {
            values.remove(&spec.level);
        }

        let value = value.trim();
        if !value.is_empty() {
            let spec = &self.hierarchy.levels[idx];
            let offered = self.hierarchy.options_at(idx, &values);
            let known = offered.iter().any(|o| o == value)
                || (spec.allows_other && value == OTHER_OPTION);
            if !known {
                return self.clone();
            }
            values.insert(level, value.to_string());
        }

        Self {
            hierarchy: self.hierarchy,
            values,
        }
    }
}

/// Next level to present for `selection` in `hierarchy`, `None` when done.
pub fn compute_next_step(hierarchy: &Hierarchy, selection: &FilterSelection) -> Option<NextStep> {
    hierarchy.next_step(selection)
}

pub fn apply_selection(selection: &FilterSelection, level: FilterLevel, value: &str) -> FilterSelection {
    selection.apply(level, value)
}

// ============================================================================
// Material type
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialType {
    Legacy,
    University,
}

impl MaterialType {
    /// Value of the `material_type` query parameter.
    pub fn key(self) -> &'static str {
        match self {
            MaterialType::Legacy => "OriNotes",
            MaterialType::University => "university",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "OriNotes" => Some(MaterialType::Legacy),
            "university" => Some(MaterialType::University),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MaterialType::Legacy => "OriNotes Material (Legacy)",
            MaterialType::University => "University Material",
        }
    }

    /// Hierarchy walked by the browse grid. University material is browsed
    /// through the server-provided course/subject form instead.
    pub fn browse_hierarchy(self) -> Option<&'static Hierarchy> {
        match self {
            MaterialType::Legacy => Some(&LEGACY_BROWSE),
            MaterialType::University => None,
        }
    }
}

/// Picking a material type always starts from an empty selection.
pub fn select_material(material: MaterialType) -> Option<FilterSelection> {
    material.browse_hierarchy().map(FilterSelection::new)
}
