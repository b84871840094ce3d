//! Static lookup tables behind the cascading filters.
//!
//! Lookup keys are the selected values of the listed ancestor levels joined
//! with `/`, skipping ancestors that were auto-skipped. For the legacy tables
//! that means `"Engineering/B.Tech"` when a course exists and plain
//! `"Class 12"` when the field has no courses.

use crate::filters::{FilterLevel, Hierarchy, LevelSpec, OptionSource};

// ============================================================================
// Legacy ("OriNotes") material
// ============================================================================

const INSTITUTION_TYPES: &[&str] = &["School", "College", "Competitive Exam"];

const FIELDS_BY_INSTITUTION_TYPE: &[(&str, &[&str])] = &[
    ("College", &["Engineering", "Medical", "Arts", "Commerce"]),
    ("School", &["Class 12", "Class 11", "Class 10"]),
    ("Competitive Exam", &["UPSC", "SSC", "Banking", "Railways"]),
];

const ALL_LEGACY_FIELDS: &[&str] = &[
    "Engineering",
    "Medical",
    "Arts",
    "Commerce",
    "Class 12",
    "Class 11",
    "Class 10",
];

const COURSES_BY_FIELD: &[(&str, &[&str])] = &[
    ("Engineering", &["B.Tech", "M.Tech", "Diploma"]),
    ("Medical", &["MBBS", "BDS", "BAMS"]),
];

const LEGACY_SUBJECTS: &[(&str, &[&str])] = &[
    (
        "Engineering/B.Tech",
        &["Computer Science", "Mechanical", "Civil", "Electronics"],
    ),
    ("Medical/MBBS", &["Anatomy", "Physiology", "Biochemistry"]),
    (
        "Class 12",
        &["Physics", "Chemistry", "Maths", "Biology", "Computer Science"],
    ),
];

// ============================================================================
// University material
// ============================================================================

const STATES: &[&str] = &["Delhi", "Maharashtra", "Uttar Pradesh"];

const INSTITUTION_TYPES_BY_STATE: &[(&str, &[&str])] = &[
    ("Delhi", &["Central University", "Technical University"]),
    ("Maharashtra", &["State University", "Private University"]),
    (
        "Uttar Pradesh",
        &["State University", "Technical University", "Private University"],
    ),
];

const INSTITUTIONS: &[(&str, &[&str])] = &[
    (
        "Delhi/Central University",
        &["University of Delhi", "Jawaharlal Nehru University", "Jamia Millia Islamia"],
    ),
    (
        "Delhi/Technical University",
        &["Delhi Technological University", "Netaji Subhas University of Technology"],
    ),
    (
        "Maharashtra/State University",
        &["University of Mumbai", "Savitribai Phule Pune University"],
    ),
    ("Maharashtra/Private University", &["Symbiosis International University"]),
    (
        "Uttar Pradesh/State University",
        &["University of Lucknow", "Chaudhary Charan Singh University"],
    ),
    (
        "Uttar Pradesh/Technical University",
        &["Dr. A.P.J. Abdul Kalam Technical University"],
    ),
    ("Uttar Pradesh/Private University", &["Amity University Lucknow"]),
];

const UNIVERSITY_COURSES: &[&str] = &["B.Tech", "BCA", "B.Sc", "MBA"];

const SEMESTERS_BY_COURSE: &[(&str, u8)] = &[("B.Tech", 8), ("BCA", 6), ("B.Sc", 6), ("MBA", 4)];

const UNIVERSITY_SUBJECTS: &[(&str, &[&str])] = &[
    (
        "B.Tech/1",
        &[
            "Engineering Mathematics I",
            "Engineering Physics",
            "Basic Electrical Engineering",
            "Programming for Problem Solving",
        ],
    ),
    (
        "B.Tech/2",
        &[
            "Engineering Mathematics II",
            "Engineering Chemistry",
            "Engineering Mechanics",
            "Basic Electronics",
        ],
    ),
    (
        "B.Tech/3",
        &["Data Structures", "Digital Electronics", "Discrete Mathematics", "Computer Organization"],
    ),
    (
        "B.Tech/4",
        &["Operating Systems", "Theory of Computation", "Database Management Systems"],
    ),
    (
        "BCA/1",
        &["Computer Fundamentals", "Programming in C", "Mathematics I"],
    ),
    ("BCA/2", &["Data Structures", "Object Oriented Programming", "Mathematics II"]),
    ("B.Sc/1", &["Mechanics", "Calculus", "Inorganic Chemistry"]),
    ("MBA/1", &["Management Principles", "Managerial Economics", "Financial Accounting"]),
    ("MBA/2", &["Marketing Management", "Human Resource Management", "Operations Management"]),
];

// ============================================================================
// Hierarchies
// ============================================================================

/// Browse flow for legacy material: institution type, field, course.
pub static LEGACY_BROWSE: Hierarchy = Hierarchy {
    name: "legacy-browse",
    levels: &[
        LevelSpec {
            level: FilterLevel::InstitutionType,
            source: OptionSource::Fixed(INSTITUTION_TYPES),
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Field,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::InstitutionType],
                table: FIELDS_BY_INSTITUTION_TYPE,
            },
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Course,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::Field],
                table: COURSES_BY_FIELD,
            },
            allows_other: false,
        },
    ],
};

/// Metadata for a personal upload: field, course, subject.
pub static PERSONAL_UPLOAD: Hierarchy = Hierarchy {
    name: "personal-upload",
    levels: &[
        LevelSpec {
            level: FilterLevel::Field,
            source: OptionSource::Fixed(ALL_LEGACY_FIELDS),
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Course,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::Field],
                table: COURSES_BY_FIELD,
            },
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Subject,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::Field, FilterLevel::Course],
                table: LEGACY_SUBJECTS,
            },
            allows_other: false,
        },
    ],
};

/// Metadata for a university upload: where it was taught, then what.
pub static UNIVERSITY_UPLOAD: Hierarchy = Hierarchy {
    name: "university-upload",
    levels: &[
        LevelSpec {
            level: FilterLevel::State,
            source: OptionSource::Fixed(STATES),
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::InstitutionType,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::State],
                table: INSTITUTION_TYPES_BY_STATE,
            },
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Institution,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::State, FilterLevel::InstitutionType],
                table: INSTITUTIONS,
            },
            allows_other: true,
        },
        LevelSpec {
            level: FilterLevel::Course,
            source: OptionSource::Fixed(UNIVERSITY_COURSES),
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Semester,
            source: OptionSource::Count {
                key: FilterLevel::Course,
                table: SEMESTERS_BY_COURSE,
            },
            allows_other: false,
        },
        LevelSpec {
            level: FilterLevel::Subject,
            source: OptionSource::Lookup {
                keys: &[FilterLevel::Course, FilterLevel::Semester],
                table: UNIVERSITY_SUBJECTS,
            },
            allows_other: true,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_are_ancestors(hierarchy: &Hierarchy) {
        for (idx, spec) in hierarchy.levels.iter().enumerate() {
            let deps: &[FilterLevel] = match &spec.source {
                OptionSource::Fixed(_) => &[],
                OptionSource::Lookup { keys, .. } => keys,
                OptionSource::Count { key, .. } => std::slice::from_ref(key),
            };
            for dep in deps {
                let pos = hierarchy.position(*dep);
                assert!(
                    pos.is_some_and(|p| p < idx),
                    "{}: {:?} depends on non-ancestor {:?}",
                    hierarchy.name,
                    spec.level,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_lookups_only_reference_ancestors() {
        keys_are_ancestors(&LEGACY_BROWSE);
        keys_are_ancestors(&PERSONAL_UPLOAD);
        keys_are_ancestors(&UNIVERSITY_UPLOAD);
    }

    #[test]
    fn test_every_institution_key_has_a_state() {
        for (key, _) in INSTITUTIONS {
            let (state, kind) = key.split_once('/').unwrap();
            let kinds = INSTITUTION_TYPES_BY_STATE
                .iter()
                .find(|(s, _)| *s == state)
                .map(|(_, k)| *k)
                .unwrap();
            assert!(kinds.contains(&kind), "{key} has no matching institution type");
        }
    }

    #[test]
    fn test_semester_table_covers_every_course() {
        for course in UNIVERSITY_COURSES {
            assert!(SEMESTERS_BY_COURSE.iter().any(|(c, _)| c == course));
        }
    }
}
