//! Request builder: turns a [`GenerationRequest`] into prompt text plus the
//! output schema the backend must honour.

use serde_json::{Map, Value, json};

use crate::types::GenerationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    StringArray,
}

impl FieldType {
    pub fn describe(self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::StringArray => "an array of strings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaField {
    pub name: &'static str,
    pub field_type: FieldType,
}

const REPOST_KIT_FIELDS: &[SchemaField] = &[
    SchemaField {
        name: "captions",
        field_type: FieldType::StringArray,
    },
    SchemaField {
        name: "hashtags",
        field_type: FieldType::StringArray,
    },
    SchemaField {
        name: "description",
        field_type: FieldType::String,
    },
    SchemaField {
        name: "analysis",
        field_type: FieldType::String,
    },
];

/// Shape of the JSON object a backend must return. Every field is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSchema {
    fields: &'static [SchemaField],
}

impl OutputSchema {
    pub fn repost_kit() -> Self {
        Self {
            fields: REPOST_KIT_FIELDS,
        }
    }

    pub fn fields(&self) -> &'static [SchemaField] {
        self.fields
    }

    pub fn required(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Gemini `responseSchema` dialect (upper-case OpenAPI type names).
    pub fn to_gemini(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                let ty = match f.field_type {
                    FieldType::String => json!({ "type": "STRING" }),
                    FieldType::StringArray => json!({
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                    }),
                };
                (f.name.to_string(), ty)
            })
            .collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": self.required(),
        })
    }

    /// JSON Schema dialect used by OpenAI-compatible `response_format`.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                let ty = match f.field_type {
                    FieldType::String => json!({ "type": "string" }),
                    FieldType::StringArray => json!({
                        "type": "array",
                        "items": { "type": "string" },
                    }),
                };
                (f.name.to_string(), ty)
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
            "additionalProperties": false,
        })
    }
}

/// Prompt text and output schema for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub text: String,
    pub schema: OutputSchema,
}

/// Build the prompt for a repost kit. Inputs are embedded as given.
pub fn build_prompt(request: &GenerationRequest) -> GenerationPrompt {
    let text = format!(
        r#"I am a content creator reposting a video on {platform}.

Video Title/Context: "{title}"
User's Extra Notes: "{context}"

Please generate the following in JSON format:
1. 3 Viral Captions (engaging, short, punchy) in "captions".
2. 15 Trending Hashtags relevant to the niche in "hashtags".
3. A professional Video Description (SEO optimized) in "description".
4. A brief "Content Strategy" tip (1 sentence) on how to best market this specific video in "analysis"."#,
        platform = request.platform,
        title = request.video_title,
        context = request.user_context,
    );

    GenerationPrompt {
        text,
        schema: OutputSchema::repost_kit(),
    }
}
