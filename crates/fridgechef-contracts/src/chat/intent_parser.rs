use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, INDEX_COMMANDS, NAME_COMMANDS, NO_ARG_COMMANDS, PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.command_args.insert(key.to_string(), value);
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn arg_u64(&self, key: &str) -> Option<u64> {
        self.command_args.get(key).and_then(Value::as_u64)
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return Intent::new("unknown", text).with_arg(
            "hint",
            Value::String("commands start with '/'; try /help".to_string()),
        );
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, PATH_COMMANDS) {
        return Intent::new(action, text)
            .with_arg("path", Value::String(parse_single_path_arg(arg)));
    }

    if let Some(action) = find_action(&command, NAME_COMMANDS) {
        return Intent::new(action, text).with_arg("name", Value::String(arg.to_string()));
    }

    if let Some(action) = find_action(&command, INDEX_COMMANDS) {
        // recipes are numbered from 1 on screen
        let index = arg
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .map(|value| Value::Number((value - 1).into()))
            .unwrap_or(Value::Null);
        return Intent::new(action, text).with_arg("index", index);
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return Intent::new(action, text);
    }

    Intent::new("unknown", text)
        .with_arg("command", Value::String(command))
        .with_arg("arg", Value::String(arg.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn blank_input_is_noop() {
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn parse_photo_with_quoted_path() {
        let intent = parse_intent("/photo \"/tmp/my fridge.jpg\"");
        assert_eq!(intent.action, "submit_photo");
        assert_eq!(intent.arg_str("path"), Some("/tmp/my fridge.jpg"));

        let bare = parse_intent("  /photo   fridge.png  ");
        assert_eq!(bare.command_args["path"], json!("fridge.png"));

        assert_eq!(parse_intent("/photo").arg_str("path"), None);
    }

    #[test]
    fn parse_filter_keeps_name_verbatim() {
        let intent = parse_intent("/filter Gluten-Free");
        assert_eq!(intent.action, "toggle_filter");
        assert_eq!(intent.arg_str("name"), Some("Gluten-Free"));

        let tab = parse_intent("/tab shopping");
        assert_eq!(tab.action, "set_tab");
        assert_eq!(tab.arg_str("name"), Some("shopping"));
    }

    #[test]
    fn parse_cook_converts_to_zero_based_index() {
        let intent = parse_intent("/cook 2");
        assert_eq!(intent.action, "select_recipe");
        assert_eq!(intent.arg_u64("index"), Some(1));

        assert_eq!(parse_intent("/cook 0").arg_u64("index"), None);
        assert_eq!(parse_intent("/cook two").arg_u64("index"), None);
    }

    #[test]
    fn parse_cooking_mode_commands() {
        assert_eq!(parse_intent("/next").action, "next_step");
        assert_eq!(parse_intent("/prev").action, "previous_step");
        assert_eq!(parse_intent("/READ").action, "read_aloud");
        assert_eq!(parse_intent("/done").action, "exit_cooking");
        assert_eq!(parse_intent("/missing").action, "add_missing");
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("magic"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }

    #[test]
    fn free_text_gets_a_hint() {
        let intent = parse_intent("what can I cook?");
        assert_eq!(intent.action, "unknown");
        assert!(intent.arg_str("hint").is_some());
    }
}
