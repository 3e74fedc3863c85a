use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use challenger_core_types::{AuthorityId, CaptchaKind, RecipeId, StepOrder};

use crate::errors::RecipeError;
use crate::lifecycle::RecipeStatus;

/// The atomic browser actions a step may perform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Load the step value as a URL.
    Navigate,
    /// Type the step value into the selector's element.
    Fill,
    /// Click the selector's element.
    Click {
        /// Marks the click that commits the challenge; dry runs skip it.
        #[serde(default)]
        final_submission: bool,
    },
    /// Choose an option in a `<select>` element.
    Select,
    /// Pure wait; the step's `wait_for` is the whole action.
    Wait,
    /// Capture an evidence screenshot with no page interaction.
    Screenshot,
    /// Invoke the session's CAPTCHA-solving capability.
    SolveCaptcha,
    /// Attach the file named by the step value to a file input.
    UploadFile,
}

/// Post-condition a step blocks on after performing its action.
/// Every variant is bounded by the runner's step timeout; a wait that
/// never satisfies is a step failure, not a silent continue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitFor {
    SelectorVisible { selector: String },
    UrlContains { fragment: String },
    Delay { ms: u64 },
}

/// One atomic action within a recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub order: StepOrder,
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Literal or `{{token}}`-templated value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<WaitFor>,
    /// Optional steps may fail without affecting the challenge outcome.
    #[serde(default)]
    pub optional: bool,
    pub description: String,
}

impl Step {
    pub fn new(order: StepOrder, action: StepAction, description: impl Into<String>) -> Self {
        Self {
            order,
            action,
            selector: None,
            value: None,
            wait_for: None,
            optional: false,
            description: description.into(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_wait(mut self, wait_for: WaitFor) -> Self {
        self.wait_for = Some(wait_for);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether a dry run must skip this step. The explicit flag on the
    /// click action is authoritative; the description marker covers
    /// recipes written before the flag existed.
    pub fn is_final_submission(&self) -> bool {
        if matches!(
            self.action,
            StepAction::Click {
                final_submission: true
            }
        ) {
            return true;
        }
        self.description.to_lowercase().contains("final submission")
    }
}

/// Persisted description of one authority's challenge flow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub authority: AuthorityId,
    pub entry_url: String,
    pub captcha: CaptchaKind,
    pub requires_account: bool,
    pub status: RecipeStatus,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(authority: AuthorityId, entry_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecipeId::new(),
            authority,
            entry_url: entry_url.into(),
            captcha: CaptchaKind::None,
            requires_account: false,
            status: RecipeStatus::Draft,
            steps: Vec::new(),
            last_verified_at: None,
            last_failed_at: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Steps in execution order.
    pub fn sorted_steps(&self) -> Vec<Step> {
        let mut steps = self.steps.clone();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// Step orders must be unique and dense, starting at 1.
    pub fn validate_steps(&self) -> Result<(), RecipeError> {
        let mut orders: Vec<u32> = self.steps.iter().map(|s| s.order.0).collect();
        orders.sort_unstable();
        for (index, order) in orders.iter().enumerate() {
            let expected = (index + 1) as u32;
            if *order != expected {
                return Err(RecipeError::InvalidStepOrder(format!(
                    "expected order {expected}, found {order}"
                )));
            }
        }
        Ok(())
    }
}
