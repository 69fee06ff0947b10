use crate::domain::IsolationType;

/// Diagnosis-code prefixes mapped to isolation categories. Codes are matched
/// by prefix so subcodes inherit the parent category.
pub(crate) const DIAGNOSIS_CATEGORIES: &[(IsolationType, &[&str])] = &[
    (
        IsolationType::Airborne,
        // Pulmonary TB, disseminated TB, measles, varicella.
        &["A15", "A19", "B05", "B01"],
    ),
    (
        IsolationType::Droplet,
        // Influenza, pertussis, meningococcal disease.
        &["J09", "J10", "J11", "A37", "A39"],
    ),
    (
        IsolationType::Contact,
        // C. difficile enterocolitis, MRSA, resistant gram-negatives, skin infections.
        &["A04.7", "B95.62", "B96.2", "Z22.32", "L08"],
    ),
    (
        IsolationType::Protective,
        // Leukemias, aplastic anemia, transplant status.
        &["C91", "C92", "D61", "Z94"],
    ),
];

/// Organism substrings matched against positive lab result text. Protective
/// isolation is driven by diagnoses only, never by culture results.
pub(crate) const ORGANISM_CATEGORIES: &[(IsolationType, &[&str])] = &[
    (
        IsolationType::Airborne,
        &["mycobacterium tuberculosis", "varicella", "measles"],
    ),
    (
        IsolationType::Droplet,
        &[
            "influenza",
            "bordetella pertussis",
            "neisseria meningitidis",
            "mycoplasma pneumoniae",
        ],
    ),
    (
        IsolationType::Contact,
        &[
            "mrsa",
            "methicillin-resistant",
            "vre",
            "vancomycin-resistant",
            "clostridioides difficile",
            "c. difficile",
            "esbl",
            "carbapenem-resistant",
        ],
    ),
];

pub(crate) fn category_for_diagnosis(code: &str) -> Option<IsolationType> {
    let code = code.trim();
    for (category, prefixes) in DIAGNOSIS_CATEGORIES {
        if prefixes.iter().any(|prefix| code.starts_with(prefix)) {
            return Some(*category);
        }
    }
    None
}

pub(crate) fn category_for_result_text(text: &str) -> Option<IsolationType> {
    let text = text.to_ascii_lowercase();
    for (category, organisms) in ORGANISM_CATEGORIES {
        if organisms.iter().any(|organism| text.contains(organism)) {
            return Some(*category);
        }
    }
    None
}

/// Tie-break when multiple categories match: the most clinically restrictive
/// wins (airborne > droplet > contact > protective).
pub(crate) fn most_restrictive(categories: &[IsolationType]) -> Option<IsolationType> {
    categories
        .iter()
        .copied()
        .max_by_key(|category| category.precedence())
}
