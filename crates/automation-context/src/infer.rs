//! Field-to-placeholder inference for the learner.
//!
//! An ordered table of patterns is matched against every textual hint a
//! form field exposes (label, then name, then id, then placeholder text).
//! The first pattern that matches any hint wins; table order therefore
//! encodes priority: the PCN patterns sit above the generic "reference"
//! catch-all, and specific name-part patterns above the full-name one.

use lazy_static::lazy_static;
use regex::Regex;

use crate::Placeholder;

struct InferenceRule {
    pattern: Regex,
    placeholder: Placeholder,
}

fn rule(pattern: &str, placeholder: Placeholder) -> InferenceRule {
    InferenceRule {
        pattern: Regex::new(&format!("(?i){pattern}")).expect("valid inference pattern"),
        placeholder,
    }
}

// Separator class covers labels ("First name"), name attributes
// ("first_name") and ids ("first-name") alike.
lazy_static! {
    static ref RULES: Vec<InferenceRule> = vec![
        rule(
            r"pcn|penalty[\s_-]*charge|charge[\s_-]*notice|parking[\s_-]*charge|notice[\s_-]*(no|num|ref)|ticket[\s_-]*(no|num|ref)",
            Placeholder::PcnNumber,
        ),
        rule(
            r"\bvrm\b|registration|number[\s_-]*plate|\breg\b|vehicle",
            Placeholder::VehicleRegistration,
        ),
        rule(r"e-?mail", Placeholder::Email),
        rule(r"phone|mobile|telephone|contact[\s_-]*number", Placeholder::Phone),
        rule(r"post[\s_-]*code|\bzip\b", Placeholder::Postcode),
        rule(r"first[\s_-]*name|forename|given[\s_-]*name", Placeholder::FirstName),
        rule(r"last[\s_-]*name|surname|family[\s_-]*name", Placeholder::LastName),
        rule(
            r"full[\s_-]*name|your[\s_-]*name|contact[\s_-]*name|^name$",
            Placeholder::FullName,
        ),
        rule(
            r"address[\s_-]*(line)?[\s_-]*(1|one)?|street|house",
            Placeholder::AddressLine1,
        ),
        rule(r"city|town", Placeholder::City),
        rule(r"reason|ground", Placeholder::Reason),
        rule(
            r"narrative|representation|appeal[\s_-]*(detail|text)|statement|comments|message|detail",
            Placeholder::Narrative,
        ),
        // Generic fallback, deliberately last: bare "reference" on an
        // appeal form is almost always the PCN.
        rule(r"reference", Placeholder::PcnNumber),
    ];
}

/// Map a field's textual hints to a placeholder. Hints are tried in the
/// order given; the first rule matching any hint wins.
pub fn infer_placeholder<'a>(hints: impl Iterator<Item = &'a str> + Clone) -> Option<Placeholder> {
    for rule in RULES.iter() {
        for hint in hints.clone() {
            if rule.pattern.is_match(hint) {
                return Some(rule.placeholder);
            }
        }
    }
    None
}
