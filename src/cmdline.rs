use std::collections::HashMap;

/// A command token plus `key=value` / `--flag` arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLine {
    pub command: Option<String>,
    pub args: HashMap<String, Option<String>>,
}

impl CommandLine {
    /// Value of a `key=value` argument.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_deref())
    }

    /// True for a `--flag` (or `key=...`) that was present at all.
    pub fn has(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }
}

/// Split one argument. `=` wins over the `--` prefix, so `--name=x` keeps
/// its dashes in the key.
pub fn parse_arg(arg: &str) -> (String, Option<String>) {
    if let Some((key, value)) = arg.split_once('=') {
        return (key.to_string(), Some(value.to_string()));
    }
    if let Some(flag) = arg.strip_prefix("--") {
        return (flag.to_string(), None);
    }
    (arg.to_string(), None)
}

/// Split `argv` (program name first) into an optional command and its
/// arguments. With `with_command` the first token after the program name
/// is the command; everything after that is an argument. Nothing is
/// validated and later duplicates win.
pub fn parse_cmdline<S: AsRef<str>>(params: &[S], with_command: bool) -> CommandLine {
    let mut params = params;
    let mut command = None;

    if with_command && params.len() > 1 {
        command = Some(params[1].as_ref().to_string());
        params = &params[1..];
    }

    let args = params
        .iter()
        .skip(1)
        .map(|arg| parse_arg(arg.as_ref()))
        .collect();

    CommandLine { command, args }
}
