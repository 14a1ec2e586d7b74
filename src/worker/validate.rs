//! Job input validation. Pure: nothing here touches the network.
use serde_json::Value;

use crate::error::{WorkerError, WorkerResult};
use crate::job::{InputImage, ValidatedInput};

const MALFORMED_IMAGES: &str = "'images' must be a list of objects with 'name' and 'image' keys";

/// Validate a raw job input, which may be a JSON mapping or a string holding
/// one.
pub fn validate_input(input: &Value) -> WorkerResult<ValidatedInput> {
    let parsed;
    let input = match input {
        Value::Null => return Err(WorkerError::InvalidInput("Please provide input".into())),
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw)
                .map_err(|_| WorkerError::InvalidInput("Invalid JSON format in input".into()))?;
            &parsed
        }
        other => other,
    };

    let workflow = match input.get("workflow") {
        None | Some(Value::Null) => return Err(WorkerError::MissingField("Missing 'workflow' parameter".into())),
        Some(workflow) => workflow.clone(),
    };

    let images = match input.get("images") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(parse_image).collect::<WorkerResult<Vec<_>>>()?,
        Some(_) => return Err(WorkerError::MalformedImages(MALFORMED_IMAGES.into())),
    };

    Ok(ValidatedInput { workflow, images })
}

fn parse_image(item: &Value) -> WorkerResult<InputImage> {
    let name = item.get("name").and_then(Value::as_str);
    let image = item.get("image").and_then(Value::as_str);
    match (name, image) {
        (Some(name), Some(image)) => Ok(InputImage { name: name.to_string(), image: image.to_string() }),
        _ => Err(WorkerError::MalformedImages(MALFORMED_IMAGES.into())),
    }
}
