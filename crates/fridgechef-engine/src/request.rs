use fridgechef_contracts::image::ImagePayload;
use fridgechef_contracts::recipes::Difficulty;
use serde_json::{json, Value};

pub const NO_RESTRICTIONS_CLAUSE: &str = "There are no dietary restrictions.";

/// Everything sent to the model for one photo: image, instruction and output schema.
#[derive(Debug, Clone)]
pub struct RecipeRequest {
    pub model: String,
    pub image: ImagePayload,
    pub filters: Vec<String>,
    pub prompt: String,
    pub schema: Value,
}

pub fn build_recipe_request(model: &str, image: ImagePayload, filters: &[String]) -> RecipeRequest {
    RecipeRequest {
        model: model.to_string(),
        image,
        filters: filters.to_vec(),
        prompt: recipe_prompt(filters),
        schema: recipe_response_schema(),
    }
}

pub fn recipe_prompt(filters: &[String]) -> String {
    let dietary = if filters.is_empty() {
        NO_RESTRICTIONS_CLAUSE.to_string()
    } else {
        format!(
            "Every recipe must suit these dietary restrictions: {}.",
            filters.join(", ")
        )
    };
    [
        "Look at the food in this photo and suggest 3 to 5 diverse recipes that can be made from it.",
        dietary.as_str(),
        "Give each recipe a full breakdown. If a recipe needs key ingredients that are not visible in the photo, list them in missingIngredients.",
        "Answer with a JSON array of recipe objects that follows the response schema exactly, with no prose or markdown around it.",
    ]
    .join("\n")
}

pub fn recipe_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "recipeName": {
                    "type": "STRING",
                    "description": "Name of the dish.",
                },
                "difficulty": {
                    "type": "STRING",
                    "enum": Difficulty::KNOWN,
                    "description": "How hard the recipe is to cook.",
                },
                "prepTime": {
                    "type": "STRING",
                    "description": "Total preparation and cooking time, e.g. '45 minutes'.",
                },
                "calories": {
                    "type": "STRING",
                    "description": "Approximate calories per serving, e.g. '550 kcal'.",
                },
                "ingredients": {
                    "type": "ARRAY",
                    "description": "Every ingredient the recipe uses.",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "quantity": { "type": "STRING" },
                        },
                        "required": ["name", "quantity"],
                    },
                },
                "steps": {
                    "type": "ARRAY",
                    "description": "Cooking instructions in order.",
                    "items": { "type": "STRING" },
                },
                "missingIngredients": {
                    "type": "ARRAY",
                    "description": "Ingredients the recipe needs that are probably not in the photo.",
                    "items": { "type": "STRING" },
                },
            },
            "required": [
                "recipeName",
                "difficulty",
                "prepTime",
                "calories",
                "ingredients",
                "steps",
                "missingIngredients",
            ],
        },
    })
}

impl RecipeRequest {
    /// Body for Gemini's `generateContent`.
    pub fn to_gemini_payload(&self) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": self.image.mime_type(),
                            "data": self.image.data(),
                        }
                    },
                    { "text": self.prompt },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": self.schema,
            },
        })
    }

    /// Same payload with the image bytes replaced by a size note, for printing.
    pub fn to_redacted_payload(&self) -> Value {
        let mut payload = self.to_gemini_payload();
        payload["contents"][0]["parts"][0]["inlineData"]["data"] = Value::String(format!(
            "<{} base64 chars>",
            self.image.data().len()
        ));
        payload
    }
}

#[cfg(test)]
mod tests {
    use fridgechef_contracts::image::ImagePayload;
    use serde_json::json;

    use super::{build_recipe_request, recipe_prompt, recipe_response_schema, NO_RESTRICTIONS_CLAUSE};

    fn image() -> ImagePayload {
        ImagePayload::from_data_url("data:image/png;base64,aGVsbG8=").unwrap()
    }

    #[test]
    fn prompt_states_no_restrictions_when_unfiltered() {
        let prompt = recipe_prompt(&[]);
        assert!(prompt.contains(NO_RESTRICTIONS_CLAUSE));
        assert!(prompt.contains("3 to 5"));
        assert!(prompt.contains("missingIngredients"));
    }

    #[test]
    fn prompt_lists_filters_in_order() {
        let prompt = recipe_prompt(&["Vegan".to_string(), "Gluten-Free".to_string()]);
        assert!(prompt.contains("dietary restrictions: Vegan, Gluten-Free."));
        assert!(!prompt.contains(NO_RESTRICTIONS_CLAUSE));
    }

    #[test]
    fn schema_requires_every_field_and_closes_difficulty() {
        let schema = recipe_response_schema();
        assert_eq!(schema["type"], json!("ARRAY"));
        let required = schema["items"]["required"].as_array().cloned().unwrap_or_default();
        assert_eq!(required.len(), 7);
        let properties = schema["items"]["properties"].as_object().cloned().unwrap_or_default();
        for field in required {
            let field = field.as_str().unwrap_or_default();
            assert!(properties.contains_key(field), "{field} missing from properties");
        }
        assert_eq!(
            schema["items"]["properties"]["difficulty"]["enum"],
            json!(["Easy", "Medium", "Hard"])
        );
    }

    #[test]
    fn gemini_payload_puts_image_before_prompt() {
        let request = build_recipe_request("gemini-2.5-flash", image(), &[]);
        let payload = request.to_gemini_payload();
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(parts[0]["inlineData"]["data"], json!("aGVsbG8="));
        assert_eq!(parts[1]["text"], json!(request.prompt));
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
        assert_eq!(payload["generationConfig"]["responseSchema"], request.schema);
    }

    #[test]
    fn redacted_payload_hides_image_bytes() {
        let request = build_recipe_request("gemini-2.5-flash", image(), &[]);
        let payload = request.to_redacted_payload();
        assert_eq!(
            payload["contents"][0]["parts"][0]["inlineData"]["data"],
            json!("<8 base64 chars>")
        );
    }
}
