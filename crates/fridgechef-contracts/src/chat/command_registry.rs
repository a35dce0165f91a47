#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "photo",
    action: "submit_photo",
}];

pub(crate) const NAME_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "filter",
        action: "toggle_filter",
    },
    CommandSpec {
        command: "tab",
        action: "set_tab",
    },
];

pub(crate) const INDEX_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "cook",
    action: "select_recipe",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "new",
        action: "new_photo",
    },
    CommandSpec {
        command: "filters",
        action: "show_filters",
    },
    CommandSpec {
        command: "recipes",
        action: "show_recipes",
    },
    CommandSpec {
        command: "next",
        action: "next_step",
    },
    CommandSpec {
        command: "prev",
        action: "previous_step",
    },
    CommandSpec {
        command: "read",
        action: "read_aloud",
    },
    CommandSpec {
        command: "done",
        action: "exit_cooking",
    },
    CommandSpec {
        command: "missing",
        action: "add_missing",
    },
    CommandSpec {
        command: "shopping",
        action: "show_shopping",
    },
    CommandSpec {
        command: "clear_shopping",
        action: "clear_shopping",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/photo <path>",
    "/new",
    "/filter <name>",
    "/filters",
    "/recipes",
    "/cook <n>",
    "/next",
    "/prev",
    "/read",
    "/done",
    "/missing",
    "/shopping",
    "/clear_shopping",
    "/tab <recipes|shopping>",
    "/status",
    "/help",
    "/quit",
];
