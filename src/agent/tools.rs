//! The single function the LLM is asked to call during target extraction.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const FUNCTION_NAME: &str = "extractRefactoringTarget";
pub const FUNCTION_DESCRIPTION: &str =
    "Extract the pull requests to refer to and the files to be refactored from the user's request";

pub const PULL_REQUEST_URLS_PARAM: &str = "pullRequestUrls";
pub const PULL_REQUEST_URLS_DESCRIPTION: &str =
    "Pull-request URLs in GitHub to refer to for refactoring";

pub const FILES_PARAM: &str = "files";
pub const FILES_DESCRIPTION: &str = "List of target files to be refactored";

/// Tool definition in the OpenAI chat-completions shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Name, description and JSON schema of a callable function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Decoded arguments of one extraction call. Both arrays are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionArguments {
    pub pull_request_urls: Vec<String>,
    pub files: Vec<String>,
}

/// How a provider spells JSON-schema type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStyle {
    /// `object`, `array`, `string`
    JsonSchema,
    /// `OBJECT`, `ARRAY`, `STRING` (Gemini's OpenAPI subset)
    OpenApiUppercase,
}

impl SchemaStyle {
    fn name(self, ty: &str) -> String {
        match self {
            SchemaStyle::JsonSchema => ty.to_string(),
            SchemaStyle::OpenApiUppercase => ty.to_uppercase(),
        }
    }
}

/// The extraction function definition.
pub fn extraction_function(style: SchemaStyle) -> FunctionDefinition {
    let string_array = |description: &str| {
        json!({
            "type": style.name("array"),
            "description": description,
            "items": { "type": style.name("string") }
        })
    };

    FunctionDefinition {
        name: FUNCTION_NAME.to_string(),
        description: FUNCTION_DESCRIPTION.to_string(),
        parameters: json!({
            "type": style.name("object"),
            "properties": {
                PULL_REQUEST_URLS_PARAM: string_array(PULL_REQUEST_URLS_DESCRIPTION),
                FILES_PARAM: string_array(FILES_DESCRIPTION),
            },
            "required": [PULL_REQUEST_URLS_PARAM, FILES_PARAM]
        }),
    }
}

/// The extraction function wrapped as an OpenAI tool.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        tool_type: "function".to_string(),
        function: extraction_function(SchemaStyle::JsonSchema),
    }]
}

/// Decode arguments given as a JSON object.
pub fn decode_arguments(value: Value) -> Result<ExtractionArguments, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Decode arguments given as a JSON-encoded string.
pub fn decode_argument_string(arguments: &str) -> Result<ExtractionArguments, String> {
    serde_json::from_str(arguments).map_err(|e| e.to_string())
}

/// Decode a loosely typed argument map, rejecting unknown argument names.
pub fn decode_argument_map(
    args: &serde_json::Map<String, Value>,
) -> Result<ExtractionArguments, String> {
    let mut decoded = ExtractionArguments::default();

    for (name, value) in args {
        let target = match name.as_str() {
            PULL_REQUEST_URLS_PARAM => &mut decoded.pull_request_urls,
            FILES_PARAM => &mut decoded.files,
            _ => return Err(format!("unknown argument for function call: {}={}", name, value)),
        };
        let values = value
            .as_array()
            .ok_or_else(|| format!("{}: expected an array", name))?;
        for v in values {
            let s = v
                .as_str()
                .ok_or_else(|| format!("{}: expected an array of strings", name))?;
            target.push(s.to_string());
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions() {
        let tools = get_tool_definitions();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].tool_type, "function");
        assert_eq!(tools[0].function.name, FUNCTION_NAME);

        let params = &tools[0].function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["files"]["items"]["type"], "string");
        assert_eq!(params["required"], json!(["pullRequestUrls", "files"]));
    }

    #[test]
    fn test_uppercase_schema() {
        let f = extraction_function(SchemaStyle::OpenApiUppercase);
        assert_eq!(f.parameters["type"], "OBJECT");
        assert_eq!(f.parameters["properties"]["pullRequestUrls"]["type"], "ARRAY");
    }

    #[test]
    fn test_decode_argument_string() {
        let args = decode_argument_string(
            r#"{"pullRequestUrls":["https://github.com/o/r/pull/1"],"files":["a.go"]}"#,
        )
        .unwrap();
        assert_eq!(args.pull_request_urls, vec!["https://github.com/o/r/pull/1"]);
        assert_eq!(args.files, vec!["a.go"]);

        assert!(decode_argument_string("not json").is_err());
        assert!(decode_argument_string(r#"{"files":["a.go"]}"#).is_err());
        assert!(decode_argument_string(r#"{"pullRequestUrls":[1],"files":[]}"#).is_err());
    }

    #[test]
    fn test_decode_argument_map() {
        let value = json!({"pullRequestUrls": ["u"], "files": ["a.go", "b.go"]});
        let args = decode_argument_map(value.as_object().unwrap()).unwrap();
        assert_eq!(args.files, vec!["a.go", "b.go"]);

        let value = json!({"other": ["x"]});
        let err = decode_argument_map(value.as_object().unwrap()).unwrap_err();
        assert!(err.contains("unknown argument"));

        let value = json!({"files": "a.go"});
        assert!(decode_argument_map(value.as_object().unwrap()).is_err());

        let value = json!({"files": [true]});
        assert!(decode_argument_map(value.as_object().unwrap()).is_err());
    }
}
