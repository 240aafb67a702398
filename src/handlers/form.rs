//! HTML form handlers
//!
//! Same prediction contract as the JSON endpoint, behind a plain form.
//! Values may carry thousands separators ("50,000").

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use validator::Validate;

use crate::{AppState, AppError};
use crate::model::{PredictionRequest, PredictionResult};
use crate::model::request::parse_lenient;
use super::run_prediction;

/// Field name → message
pub type FieldErrors = BTreeMap<String, String>;

/// Form field description: name, label, help text, whole number
const FIELDS: &[(&str, &str, &str, bool)] = &[
    ("income", "Annual Income", "Enter your total annual income.", false),
    ("age", "Age", "Enter your current age (must be 18 or older).", true),
    ("loan_amount", "Loan Amount", "Enter the total amount of the loan you are requesting.", false),
    ("loan_term_months", "Loan Term (Months)", "Enter the desired loan term in months.", true),
    ("credit_score", "Credit Score", "Enter your current credit score (e.g., 300-850).", false),
    ("num_of_defaults", "Number of Past Defaults", "Enter the total number of times you have defaulted on a loan.", true),
    ("employment_years", "Years of Employment", "Enter the number of years at your current job.", false),
];

/// Validated applicant input
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ApplicantForm {
    #[validate(range(min = 0.0, message = "Ensure this value is greater than or equal to 0."))]
    pub income: f64,

    #[validate(range(min = 18, message = "Ensure this value is greater than or equal to 18."))]
    pub age: i64,

    #[validate(range(min = 0.0, message = "Ensure this value is greater than or equal to 0."))]
    pub loan_amount: f64,

    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub loan_term_months: i64,

    #[validate(range(min = 300.0, max = 850.0, message = "Ensure this value is between 300 and 850."))]
    pub credit_score: f64,

    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub num_of_defaults: i64,

    #[validate(range(min = 0.0, message = "Ensure this value is greater than or equal to 0."))]
    pub employment_years: f64,
}

impl ApplicantForm {
    /// Parse and validate raw form fields
    pub fn parse(fields: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut values = HashMap::new();

        for (name, _, _, whole) in FIELDS {
            if let Some(value) = read_field(fields, &mut errors, name, *whole) {
                values.insert(*name, value);
            }
        }

        let get = |name: &str| values.get(name).copied().unwrap_or_default();

        let form = ApplicantForm {
            income: get("income"),
            age: get("age") as i64,
            loan_amount: get("loan_amount"),
            loan_term_months: get("loan_term_months") as i64,
            credit_score: get("credit_score"),
            num_of_defaults: get("num_of_defaults") as i64,
            employment_years: get("employment_years"),
        };

        // Range checks still run so every bad field is reported at once.
        // Fields that failed to parse keep their parse error.
        if let Err(validation) = form.validate() {
            for (field, field_errors) in validation.field_errors() {
                let message = field_errors
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value.".to_string());
                errors.entry(field.to_string()).or_insert(message);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(form)
    }

    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest::new()
            .with("income", self.income)
            .with("age", self.age)
            .with("loan_amount", self.loan_amount)
            .with("loan_term_months", self.loan_term_months)
            .with("credit_score", self.credit_score)
            .with("num_of_defaults", self.num_of_defaults)
            .with("employment_years", self.employment_years)
    }
}

fn read_field(
    fields: &HashMap<String, String>,
    errors: &mut FieldErrors,
    name: &str,
    whole: bool,
) -> Option<f64> {
    let raw = match fields.get(name).map(|s| s.trim()) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            errors.insert(name.to_string(), "This field is required.".to_string());
            return None;
        }
    };

    let Some(value) = parse_lenient(raw) else {
        errors.insert(name.to_string(), "Enter a number.".to_string());
        return None;
    };

    if whole && value.fract() != 0.0 {
        errors.insert(name.to_string(), "Enter a whole number.".to_string());
        return None;
    }

    Some(value)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET / - empty form
pub async fn show() -> Html<String> {
    Html(render_form(&HashMap::new(), &FieldErrors::new()))
}

/// POST / - validate, predict, render result
pub async fn submit(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let form = match ApplicantForm::parse(&fields) {
        Ok(form) => form,
        Err(errors) => {
            tracing::debug!("Form rejected: {:?}", errors);
            return invalid(&fields, &errors);
        }
    };

    match run_prediction(&state, form.to_request()).await {
        Ok(Ok(result)) => Html(render_result(&result)).into_response(),
        Ok(Err(err)) if err.is_input_error() => {
            let errors = FieldErrors::from([("__all__".to_string(), err.to_string())]);
            invalid(&fields, &errors)
        }
        Ok(Err(err)) => failure(err.into()),
        Err(err) => failure(err.into()),
    }
}

fn invalid(fields: &HashMap<String, String>, errors: &FieldErrors) -> Response {
    (StatusCode::BAD_REQUEST, Html(render_form(fields, errors))).into_response()
}

/// Server-side failure as an HTML page, same status as the JSON endpoint
fn failure(err: AppError) -> Response {
    let (status, message) = err.status_and_message();
    (status, Html(render_error(message))).into_response()
}

// ============================================================================
// RENDERING
// ============================================================================

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Financial Risk Prediction</title>
</head>
<body>
  <h1>Financial Risk Prediction</h1>
{body}
</body>
</html>
"#;

fn render_page(body: &str) -> String {
    PAGE_TEMPLATE.replace("{body}", body)
}

pub fn render_form(values: &HashMap<String, String>, errors: &FieldErrors) -> String {
    let mut body = String::from("  <form method=\"post\" action=\"/\">\n");

    if let Some(message) = errors.get("__all__") {
        body.push_str(&format!("    <p class=\"error\">{}</p>\n", escape(message)));
    }

    for (name, label, help, whole) in FIELDS {
        let value = values.get(*name).map(String::as_str).unwrap_or("");
        let step = if *whole { "1" } else { "any" };

        body.push_str(&format!(
            "    <p>\n      <label for=\"id_{name}\">{label}</label>\n      \
             <input type=\"text\" inputmode=\"decimal\" name=\"{name}\" id=\"id_{name}\" \
             data-step=\"{step}\" value=\"{value}\">\n      <small>{help}</small>\n",
            name = name,
            label = label,
            step = step,
            value = escape(value),
            help = help,
        ));

        if let Some(message) = errors.get(*name) {
            body.push_str(&format!("      <span class=\"error\">{}</span>\n", escape(message)));
        }

        body.push_str("    </p>\n");
    }

    body.push_str("    <button type=\"submit\">Predict</button>\n  </form>");
    render_page(&body)
}

pub fn render_result(result: &PredictionResult) -> String {
    let mut body = format!(
        "  <h2 class=\"risk-{}\">{}</h2>\n",
        result.label.as_class(),
        result.label.description()
    );

    if let Some(p) = result.probability {
        body.push_str(&format!("  <p>Confidence: {:.1}%</p>\n", p * 100.0));
    }

    body.push_str("  <p><a href=\"/\">Check another applicant</a></p>");
    render_page(&body)
}

pub fn render_error(message: &str) -> String {
    render_page(&format!(
        "  <p class=\"error\">{}</p>\n  <p><a href=\"/\">Back to the form</a></p>",
        escape(message)
    ))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
