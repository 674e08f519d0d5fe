//! Looking up and running user commands.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::EditorEvent;
use crate::plugin::{PluginError, PluginResult};
use crate::resources::{USER_COMMANDS, UserCommand};
use crate::state::EditorState;
use crate::{CoreError, CoreResult};

/// Finds a command by id. The first contribution wins.
pub fn find_command(state: &EditorState, id: &str) -> Option<UserCommand> {
    state
        .resource(USER_COMMANDS)
        .into_iter()
        .find(|command| command.id == id)
}

/// Runs the command `id` with `params`.
pub fn exec_command(state: &mut EditorState, id: &str, params: &Value) -> CoreResult<()> {
    let command = find_command(state, id).ok_or_else(|| CoreError::CommandNotFound(id.to_string()))?;
    if !command.is_available(state) {
        return Err(CoreError::CommandUnavailable(id.to_string()));
    }

    tracing::debug!(command = id, "executing command");
    command.run(state, params)?;
    state.emit(EditorEvent::CommandExecuted(id.to_string()));
    Ok(())
}

/// Decodes command parameters. `null` decodes like an empty object.
pub fn params<T: DeserializeOwned>(value: &Value) -> PluginResult<T> {
    let value = match value {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|err| PluginError::InvalidParams(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Resources;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Insert {
        text: String,
        #[serde(default)]
        times: usize,
    }

    fn state_with_commands() -> EditorState {
        let mut state = EditorState::for_tests("<p>a</p>");
        state.resources_mut().register(
            "demo",
            Resources::new()
                .add(
                    USER_COMMANDS,
                    UserCommand::new("append", "Append", |state, value| {
                        let args: Insert = params(value)?;
                        let p = state.document.first_child(state.document.root());
                        let text = p.and_then(|p| state.document.first_child(p));
                        if let Some(text) = text {
                            let len = state.document.node_length(text);
                            state.document.insert_text(text, len, &args.text.repeat(args.times.max(1)))?;
                        }
                        Ok(())
                    }),
                )
                .add(
                    USER_COMMANDS,
                    UserCommand::new("never", "Never", |_, _| Ok(())).available_when(|_| false),
                ),
        );
        state
    }

    #[test]
    fn test_exec_runs_command_and_emits() {
        let mut state = state_with_commands();
        let mut events = crate::event::EventHandler::new(state.events().subscribe());
        exec_command(&mut state, "append", &json!({"text": "b", "times": 2})).unwrap();
        assert_eq!(state.document.inner_html(), "<p>abb</p>");
        assert_eq!(
            events.try_next(),
            Some(EditorEvent::CommandExecuted("append".into()))
        );
    }

    #[test]
    fn test_unknown_and_unavailable_commands() {
        let mut state = state_with_commands();
        assert!(matches!(
            exec_command(&mut state, "missing", &Value::Null),
            Err(CoreError::CommandNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            exec_command(&mut state, "never", &Value::Null),
            Err(CoreError::CommandUnavailable(_))
        ));
    }

    #[test]
    fn test_invalid_params_are_reported() {
        let mut state = state_with_commands();
        let result = exec_command(&mut state, "append", &json!({"times": 1}));
        assert!(matches!(
            result,
            Err(CoreError::Plugin(PluginError::InvalidParams(_)))
        ));
        assert_eq!(state.document.inner_html(), "<p>a</p>");
    }

    #[test]
    fn test_null_params_decode_as_defaults() {
        #[derive(Deserialize, Default)]
        struct Options {
            #[serde(default)]
            force: bool,
        }
        let options: Options = params(&Value::Null).unwrap();
        assert!(!options.force);
    }
}
