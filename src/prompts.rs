//! Prompts for querying a vision-language model with GHOST statements.
//!
//! Dataset statements follow three fixed templates (object presence,
//! attribute, relation). They are rewritten into plainer English and wrapped
//! in a True/False question. No model is called here; [`plan_requests`]
//! produces the requests an external prediction generator sends.

use crate::dataset::{GhostDataset, image_file_name, label_from_key, object_id_from_key};
use crate::error::Result;
use crate::prediction::Label;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const PRESENCE_PREFIX: &str = "A ";
const PRESENCE_SUFFIX: &str = " is present in the image.";
const ATTRIBUTE_SEPARATORS: [&str; 3] = [" of the ", " present in the image is ", "."];
const RELATION_SEPARATORS: [&str; 4] = [" between the ", " and ", " is that the ", "."];

/// Collection of prompt templates.
pub struct Prompts;

impl Prompts {
    /// Question wrapped around every statement. `{statement}` is substituted.
    pub fn true_false_template() -> &'static str {
        "Is the following statement about the image true or false: '{statement}'? Please respond with only 'True' or 'False'."
    }

    /// Wrap a statement in the True/False question.
    pub fn true_false(statement: &str) -> String {
        Self::true_false_template().replace("{statement}", statement)
    }
}

/// Rewrite a templated GHOST statement into natural language.
///
/// Statements that match none of the templates are returned unchanged.
pub fn to_natural_language(statement: &str) -> String {
    if let Some(object) = match_presence(statement) {
        return format!("There is a {} in the image.", object);
    }

    if let Some(parts) = match_template(statement, "The ", &ATTRIBUTE_SEPARATORS) {
        let (attribute, object, value) = (parts[0], parts[1], parts[2]);
        return format!("In the image, the {} of the {} is {}.", attribute, object, value);
    }

    if let Some(parts) = match_template(statement, "The ", &RELATION_SEPARATORS) {
        let (relation, first, second, description) = (parts[0], parts[1], parts[2], parts[3]);
        if relation == "spatial" {
            return format!(
                "In the image, the spatial relationship between the {} and {} is: {}.",
                first, second, description
            );
        }
        return format!(
            "In the image, the {} connecting the {} and the {} is that {}.",
            relation, first, second, description
        );
    }

    statement.to_string()
}

/// Object name of `A {object} is present in the image.`
///
/// The object runs to the last occurrence of the suffix on the first line.
fn match_presence(statement: &str) -> Option<&str> {
    let line = statement.split('\n').next()?;
    let rest = line.strip_prefix(PRESENCE_PREFIX)?;
    let end = rest.rfind(PRESENCE_SUFFIX)?;
    Some(&rest[..end])
}

/// Match `{prefix}{a}{sep0}{b}{sep1}...` anchored at the start, taking the
/// shortest capture before each separator. Captures never cross a newline.
fn match_template<'a>(statement: &'a str, prefix: &str, separators: &[&str]) -> Option<Vec<&'a str>> {
    let line = statement.split('\n').next()?;
    let mut rest = line.strip_prefix(prefix)?;
    let mut captures = Vec::with_capacity(separators.len());

    for separator in separators {
        let end = rest.find(separator)?;
        captures.push(&rest[..end]);
        rest = &rest[end + separator.len()..];
    }

    Some(captures)
}

/// Everything needed to ask a model one question and record its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub question_id: String,
    pub object_id: String,
    /// Image file name, relative to the image directory.
    pub image: String,
    /// Original dataset statement (stored as `text` in prediction files).
    pub statement: String,
    /// Full prompt sent to the model.
    pub prompt: String,
    pub label: Label,
}

impl PromptRequest {
    /// Build the request for one dataset entry.
    pub fn new(question_id: &str, statement: &str, image_extension: &str) -> Result<Self> {
        Ok(Self {
            question_id: question_id.to_string(),
            object_id: object_id_from_key(question_id)?,
            image: image_file_name(question_id, image_extension),
            statement: statement.to_string(),
            prompt: Prompts::true_false(&to_natural_language(statement)),
            label: label_from_key(question_id),
        })
    }
}

/// Requests for every dataset entry not yet in `completed`, in dataset order.
pub fn plan_requests(
    dataset: &GhostDataset,
    completed: &HashSet<String>,
    image_extension: &str,
) -> Result<Vec<PromptRequest>> {
    dataset
        .pending(completed)
        .into_iter()
        .map(|entry| PromptRequest::new(&entry.question_id, &entry.statement, image_extension))
        .collect()
}
