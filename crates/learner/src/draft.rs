//! Draft step generation from discovered form fields.

use automation_context::{infer_placeholder, Placeholder};
use browser_session::FormField;
use challenger_core_types::{CaptchaKind, StepOrder};
use recipes::{Step, StepAction};

/// Selector for the submission control; generic on purpose, reviewers
/// tighten it when a portal needs something more specific.
const SUBMIT_SELECTOR: &str = "button[type=submit], input[type=submit]";

fn field_title(field: &FormField) -> String {
    field
        .hints()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| field.selector.clone())
}

fn step_for_field(order: StepOrder, field: &FormField) -> Step {
    let inferred = infer_placeholder(field.hints());
    let title = field_title(field);

    let (action, description) = match field.input_type.as_str() {
        "select" => (StepAction::Select, format!("Choose {title}")),
        "checkbox" => (
            StepAction::Click {
                final_submission: false,
            },
            format!("Tick {title}"),
        ),
        "file" => (StepAction::UploadFile, format!("Attach {title}")),
        _ => (StepAction::Fill, format!("Enter {title}")),
    };

    let mut step = Step::new(order, action, description).with_selector(&field.selector);

    match inferred {
        Some(placeholder) => {
            if !matches!(step.action, StepAction::Click { .. }) {
                step = step.with_value(placeholder.templated());
            }
            if matches!(step.action, StepAction::Click { .. }) && !field.required {
                step = step.optional();
            }
        }
        None => {
            // Unmapped fields stay in the draft so review sees the whole
            // form surface, but they cannot block a run.
            step = step.optional();
            step.description = format!("{} (unmapped - set a value before approval)", step.description);
        }
    }
    step
}

/// Build the draft step list: open the portal, fill every discovered
/// field, solve the CAPTCHA when one is present, then submit.
pub fn draft_steps(entry_url: &str, fields: &[FormField], captcha: CaptchaKind) -> Vec<Step> {
    let mut steps = Vec::with_capacity(fields.len() + 3);
    let mut order = StepOrder::first();

    steps.push(
        Step::new(order, StepAction::Navigate, "Open the challenge portal")
            .with_value(entry_url),
    );

    for field in fields {
        order = order.next();
        steps.push(step_for_field(order, field));
    }

    if captcha.requires_solver() {
        order = order.next();
        steps.push(Step::new(
            order,
            StepAction::SolveCaptcha,
            "Solve the captcha challenge",
        ));
    }

    order = order.next();
    steps.push(
        Step::new(
            order,
            StepAction::Click {
                final_submission: true,
            },
            "Submit the challenge form",
        )
        .with_selector(SUBMIT_SELECTOR),
    );

    steps
}

/// Exposed for draft previews in review tooling.
pub fn placeholder_for_field(field: &FormField) -> Option<Placeholder> {
    infer_placeholder(field.hints())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(selector: &str, label: &str, input_type: &str) -> FormField {
        FormField {
            selector: selector.into(),
            label: Some(label.into()),
            input_type: input_type.into(),
            ..Default::default()
        }
    }

    #[test]
    fn draft_has_navigate_fills_and_final_submit() {
        let fields = vec![
            field("#pcn", "PCN number", "text"),
            field("#reg", "Vehicle registration", "text"),
            field("#details", "Appeal details", "textarea"),
        ];
        let steps = draft_steps("https://example.test/appeal", &fields, CaptchaKind::None);

        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0].action, StepAction::Navigate);
        assert_eq!(steps[1].value.as_deref(), Some("{{pcn_number}}"));
        assert_eq!(steps[2].value.as_deref(), Some("{{vehicle_registration}}"));
        assert_eq!(steps[3].value.as_deref(), Some("{{narrative}}"));
        assert!(steps[4].is_final_submission());

        // Orders are dense and increasing.
        for (index, step) in steps.iter().enumerate() {
            assert_eq!(step.order.0, (index + 1) as u32);
        }
    }

    #[test]
    fn captcha_inserts_a_solve_step_before_submit() {
        let steps = draft_steps("https://example.test", &[], CaptchaKind::Recaptcha);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].action, StepAction::SolveCaptcha);
        assert!(steps[2].is_final_submission());
    }

    #[test]
    fn unmapped_fields_become_optional() {
        let fields = vec![field("#colour", "Favourite colour", "text")];
        let steps = draft_steps("https://example.test", &fields, CaptchaKind::None);
        assert!(steps[1].optional);
        assert!(steps[1].value.is_none());
        assert!(steps[1].description.contains("unmapped"));
    }

    #[test]
    fn select_fields_use_the_select_action() {
        let fields = vec![field("#reason", "Reason for appeal", "select")];
        let steps = draft_steps("https://example.test", &fields, CaptchaKind::None);
        assert_eq!(steps[1].action, StepAction::Select);
        assert_eq!(steps[1].value.as_deref(), Some("{{reason}}"));
    }
}
