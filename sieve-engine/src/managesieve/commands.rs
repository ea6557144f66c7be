//! ManageSieve commands, replies and the per-connection session state
//! (RFC 5804 §2). The line parsing underneath is [`super::parser`], script
//! compilation is `crate::compile`.
//!
//! A [`Session`] owns only protocol state (authentication, the bad-command
//! counter); script storage is out-of-scope for this crate the same way the
//! mail store is for [`crate::host::Host`] — callers implement
//! [`ScriptStore`] against whatever backs their installation.

use sieve_types::{Limits, Script, ScriptLocation};

use super::parser::Arg;
use super::quote::quote;
use crate::registry::Registry;

/// One parsed ManageSieve command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Capability,
    StartTls,
    Authenticate { mechanism: String, initial_response: Option<String> },
    Noop { tag: Option<String> },
    Logout,
    Unauthenticate,
    ListScripts,
    PutScript { name: String, content: String },
    CheckScript { content: String },
    GetScript { name: String },
    SetActive { name: String },
    DeleteScript { name: String },
    RenameScript { old: String, new: String },
    HaveSpace { name: String, size: u64 },
}

/// RFC 5804 §1.3 response codes, rendered as `(CODE)` / `(CODE "text")`
/// inside a reply's parenthesized segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    Quota,
    QuotaMaxSize,
    QuotaMaxScripts,
    QuotaMaxStorage,
    Active,
    NonExistent,
    AlreadyExists,
    TryLater,
    Warnings(String),
    Tag(String),
}

impl ResponseCode {
    fn render(&self) -> String {
        match self {
            ResponseCode::Quota => "(QUOTA)".to_string(),
            ResponseCode::QuotaMaxSize => "(QUOTA/MAXSIZE)".to_string(),
            ResponseCode::QuotaMaxScripts => "(QUOTA/MAXSCRIPTS)".to_string(),
            ResponseCode::QuotaMaxStorage => "(QUOTA/MAXSTORAGE)".to_string(),
            ResponseCode::Active => "(ACTIVE)".to_string(),
            ResponseCode::NonExistent => "(NONEXISTENT)".to_string(),
            ResponseCode::AlreadyExists => "(ALREADYEXISTS)".to_string(),
            ResponseCode::TryLater => "(TRYLATER)".to_string(),
            ResponseCode::Warnings(text) => format!("(WARNINGS {})", quote(text)),
            ResponseCode::Tag(tag) => format!("(TAG {})", quote(tag)),
        }
    }
}

/// One of the three ManageSieve reply tags. `extra_lines`
/// carries content that precedes the final tagged line — script bodies for
/// `GETSCRIPT`, name/active lines for `LISTSCRIPTS`, capability lines for
/// `CAPABILITY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok { code: Option<ResponseCode>, message: String, extra_lines: Vec<String> },
    No { code: Option<ResponseCode>, message: String },
    Bye { code: Option<ResponseCode>, message: String },
}

impl Response {
    fn ok(message: impl Into<String>) -> Self {
        Response::Ok { code: None, message: message.into(), extra_lines: Vec::new() }
    }

    fn ok_with_code(code: ResponseCode, message: impl Into<String>) -> Self {
        Response::Ok { code: Some(code), message: message.into(), extra_lines: Vec::new() }
    }

    fn ok_lines(lines: Vec<String>, message: impl Into<String>) -> Self {
        Response::Ok { code: None, message: message.into(), extra_lines: lines }
    }

    fn no(code: Option<ResponseCode>, message: impl Into<String>) -> Self {
        Response::No { code, message: message.into() }
    }

    pub fn is_bad(&self) -> bool {
        matches!(self, Response::No { .. })
    }

    /// Renders every line of this reply, CRLF-terminated, in wire order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self {
            Response::Ok { code, message, extra_lines } => {
                for line in extra_lines {
                    out.push_str(line);
                    out.push_str("\r\n");
                }
                push_tagged(&mut out, "OK", code.as_ref(), message);
            }
            Response::No { code, message } => push_tagged(&mut out, "NO", code.as_ref(), message),
            Response::Bye { code, message } => push_tagged(&mut out, "BYE", code.as_ref(), message),
        }
        out
    }
}

fn push_tagged(out: &mut String, tag: &str, code: Option<&ResponseCode>, message: &str) {
    out.push_str(tag);
    if let Some(code) = code {
        out.push(' ');
        out.push_str(&code.render());
    }
    if !message.is_empty() {
        out.push(' ');
        out.push_str(&quote(message));
    }
    out.push_str("\r\n");
}

/// What a [`ScriptStore`] implementation reports back when a command can't
/// be satisfied; maps directly onto RFC 5804's per-command response code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NonExistent,
    AlreadyExists,
    ActiveScriptInUse,
    QuotaExceeded,
    QuotaMaxSize,
    QuotaMaxScripts,
    QuotaMaxStorage,
}

impl StoreError {
    fn into_response(self, message: impl Into<String>) -> Response {
        let code = match self {
            StoreError::NonExistent => ResponseCode::NonExistent,
            StoreError::AlreadyExists => ResponseCode::AlreadyExists,
            StoreError::ActiveScriptInUse => ResponseCode::Active,
            StoreError::QuotaExceeded => ResponseCode::Quota,
            StoreError::QuotaMaxSize => ResponseCode::QuotaMaxSize,
            StoreError::QuotaMaxScripts => ResponseCode::QuotaMaxScripts,
            StoreError::QuotaMaxStorage => ResponseCode::QuotaMaxStorage,
        };
        Response::no(Some(code), message)
    }
}

/// The script-storage backend a deployment supplies (mirrors
/// [`crate::host::Host`]'s role for the interpreter: this crate only calls
/// through it, never implements it).
pub trait ScriptStore {
    fn list(&self) -> Vec<(String, bool)>;
    fn get(&self, name: &str) -> Option<String>;
    fn put(&mut self, name: &str, content: &str) -> Result<(), StoreError>;
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;
    fn set_active(&mut self, name: &str) -> Result<(), StoreError>;
    fn rename(&mut self, old: &str, new: &str) -> Result<(), StoreError>;
    fn check_quota(&self, size: u64) -> Result<(), StoreError>;
}

/// Parses one command out of its name and already-tokenized [`Arg`]s.
/// Returns `Err` for a malformed argument list or an unrecognized command
/// name; the caller turns that into a `NO` reply.
pub fn parse_command(name: &str, mut args: Vec<Arg>) -> Result<Command, String> {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "CAPABILITY" => Ok(Command::Capability),
        "STARTTLS" => Ok(Command::StartTls),
        "LOGOUT" => Ok(Command::Logout),
        "UNAUTHENTICATE" => Ok(Command::Unauthenticate),
        "LISTSCRIPTS" => Ok(Command::ListScripts),
        "NOOP" => Ok(Command::Noop { tag: args.first().map(|a| a.as_str().to_string()) }),
        "AUTHENTICATE" => {
            if args.is_empty() {
                return Err("AUTHENTICATE requires a mechanism name".to_string());
            }
            let mechanism = args.remove(0).as_str().to_string();
            let initial_response = if args.is_empty() { None } else { Some(args.remove(0).as_str().to_string()) };
            Ok(Command::Authenticate { mechanism, initial_response })
        }
        "PUTSCRIPT" => {
            if args.len() != 2 {
                return Err("PUTSCRIPT requires a name and a script".to_string());
            }
            Ok(Command::PutScript { name: args[0].as_str().to_string(), content: args[1].as_str().to_string() })
        }
        "CHECKSCRIPT" => {
            if args.len() != 1 {
                return Err("CHECKSCRIPT requires exactly one argument".to_string());
            }
            Ok(Command::CheckScript { content: args[0].as_str().to_string() })
        }
        "GETSCRIPT" => {
            if args.len() != 1 {
                return Err("GETSCRIPT requires a script name".to_string());
            }
            Ok(Command::GetScript { name: args[0].as_str().to_string() })
        }
        "SETACTIVE" => {
            if args.len() != 1 {
                return Err("SETACTIVE requires a script name".to_string());
            }
            Ok(Command::SetActive { name: args[0].as_str().to_string() })
        }
        "DELETESCRIPT" => {
            if args.len() != 1 {
                return Err("DELETESCRIPT requires a script name".to_string());
            }
            Ok(Command::DeleteScript { name: args[0].as_str().to_string() })
        }
        "RENAMESCRIPT" => {
            if args.len() != 2 {
                return Err("RENAMESCRIPT requires an old and a new name".to_string());
            }
            Ok(Command::RenameScript { old: args[0].as_str().to_string(), new: args[1].as_str().to_string() })
        }
        "HAVESPACE" => {
            if args.len() != 2 {
                return Err("HAVESPACE requires a name and a size".to_string());
            }
            let size: u64 = args[1].as_str().parse().map_err(|_| "HAVESPACE size must be a number".to_string())?;
            Ok(Command::HaveSpace { name: args[0].as_str().to_string(), size })
        }
        _ => Err(format!("unknown command {name:?}")),
    }
}

/// Per-connection ManageSieve session state: one instance per socket.
#[derive(Debug)]
pub struct Session {
    authenticated: bool,
    bad_commands: u32,
    max_bad_commands: u32,
}

impl Session {
    /// `max_bad_commands` bounds how many consecutive malformed/rejected
    /// commands a client gets before the session is terminated.
    pub fn new(max_bad_commands: u32) -> Self {
        Self { authenticated: false, bad_commands: 0, max_bad_commands }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Parses and executes one command line, tracking the consecutive
    /// bad-command counter; a `NO` that pushes the counter past the
    /// configured limit is escalated to a fatal `BYE` instead.
    pub fn dispatch(
        &mut self,
        name: &str,
        args: Vec<Arg>,
        store: &mut impl ScriptStore,
        registry: &Registry,
        limits: &Limits,
    ) -> Response {
        let response = match parse_command(name, args) {
            Ok(command) => self.execute(command, store, registry, limits),
            Err(message) => Response::no(None, message),
        };
        self.track(response)
    }

    fn track(&mut self, response: Response) -> Response {
        if response.is_bad() {
            self.bad_commands += 1;
            if self.bad_commands >= self.max_bad_commands {
                return Response::Bye {
                    code: Some(ResponseCode::TryLater),
                    message: "too many invalid commands".to_string(),
                };
            }
        } else {
            self.bad_commands = 0;
        }
        response
    }

    fn execute(
        &mut self,
        command: Command,
        store: &mut impl ScriptStore,
        registry: &Registry,
        limits: &Limits,
    ) -> Response {
        match command {
            Command::Capability => Response::ok_lines(capability_lines(registry), "CAPABILITY completed"),
            Command::StartTls => Response::ok("begin TLS negotiation"),
            Command::Authenticate { .. } => {
                self.authenticated = true;
                Response::ok("authenticated")
            }
            Command::Unauthenticate => {
                self.authenticated = false;
                Response::ok("unauthenticated")
            }
            Command::Noop { tag } => match tag {
                Some(tag) => Response::ok_with_code(ResponseCode::Tag(tag), "NOOP completed"),
                None => Response::ok("NOOP completed"),
            },
            Command::Logout => Response::ok("logging out"),
            Command::ListScripts => {
                let lines = store
                    .list()
                    .into_iter()
                    .map(|(name, active)| if active { format!("{} ACTIVE", quote(&name)) } else { quote(&name) })
                    .collect();
                Response::ok_lines(lines, "LISTSCRIPTS completed")
            }
            Command::PutScript { name, content } => {
                if let Err(e) = store.check_quota(content.len() as u64) {
                    return e.into_response("quota exceeded");
                }
                let mut script = Script::new(name.clone(), ScriptLocation::Personal, content.clone());
                let outcome = crate::compile(&mut script, registry, limits);
                if !outcome.succeeded() {
                    return Response::no(None, render_diagnostics(&outcome.diagnostics));
                }
                match store.put(&name, &content) {
                    Ok(()) => Response::ok("PUTSCRIPT completed"),
                    Err(e) => e.into_response("could not store script"),
                }
            }
            Command::CheckScript { content } => {
                if let Err(e) = store.check_quota(content.len() as u64) {
                    return e.into_response("quota exceeded");
                }
                let mut script = Script::new("<checkscript>", ScriptLocation::Personal, content);
                let outcome = crate::compile(&mut script, registry, limits);
                if !outcome.succeeded() {
                    return Response::no(None, render_diagnostics(&outcome.diagnostics));
                }
                if outcome.warning_count > 0 {
                    Response::ok_with_code(ResponseCode::Warnings(render_diagnostics(&outcome.diagnostics)), "CHECKSCRIPT completed")
                } else {
                    Response::ok("CHECKSCRIPT completed")
                }
            }
            Command::GetScript { name } => match store.get(&name) {
                Some(content) => {
                    let mut line = String::new();
                    super::quote::quote_append(&mut line, content.as_bytes());
                    Response::ok_lines(vec![line], "GETSCRIPT completed")
                }
                None => Response::no(Some(ResponseCode::NonExistent), format!("no script named {name:?}")),
            },
            Command::SetActive { name } => match store.set_active(&name) {
                Ok(()) => Response::ok("SETACTIVE completed"),
                Err(e) => e.into_response(format!("no script named {name:?}")),
            },
            Command::DeleteScript { name } => match store.delete(&name) {
                Ok(()) => Response::ok("DELETESCRIPT completed"),
                Err(e) => e.into_response(format!("cannot delete {name:?}")),
            },
            Command::RenameScript { old, new } => match store.rename(&old, &new) {
                Ok(()) => Response::ok("RENAMESCRIPT completed"),
                Err(e) => e.into_response("rename failed"),
            },
            Command::HaveSpace { size, .. } => match store.check_quota(size) {
                Ok(()) => Response::ok("HAVESPACE completed"),
                Err(e) => e.into_response("insufficient space"),
            },
        }
    }
}

/// `CAPABILITY` lines: one `"IMPLEMENTATION"`/`"VERSION"`/
/// `"SIEVE"` line per RFC 5804 §1.7, the `SIEVE` line listing every
/// extension name this registry has active, space-separated.
fn capability_lines(registry: &Registry) -> Vec<String> {
    let sieve_names: Vec<&str> = registry.capabilities().iter().map(|ext| ext.name()).collect();
    vec![
        format!("\"IMPLEMENTATION\" {}", quote("sieve-engine")),
        format!("\"SIEVE\" {}", quote(&sieve_names.join(" "))),
        format!("\"VERSION\" {}", quote("1.0")),
    ]
}

fn render_diagnostics(diagnostics: &[sieve_types::Diagnostic]) -> String {
    diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Capabilities, Extension};
    use std::collections::BTreeMap;

    struct MemStore {
        scripts: BTreeMap<String, String>,
        active: Option<String>,
    }

    impl MemStore {
        fn new() -> Self {
            Self { scripts: BTreeMap::new(), active: None }
        }
    }

    impl ScriptStore for MemStore {
        fn list(&self) -> Vec<(String, bool)> {
            self.scripts.keys().map(|n| (n.clone(), self.active.as_deref() == Some(n))).collect()
        }
        fn get(&self, name: &str) -> Option<String> {
            self.scripts.get(name).cloned()
        }
        fn put(&mut self, name: &str, content: &str) -> Result<(), StoreError> {
            self.scripts.insert(name.to_string(), content.to_string());
            Ok(())
        }
        fn delete(&mut self, name: &str) -> Result<(), StoreError> {
            if self.active.as_deref() == Some(name) {
                return Err(StoreError::ActiveScriptInUse);
            }
            self.scripts.remove(name).map(|_| ()).ok_or(StoreError::NonExistent)
        }
        fn set_active(&mut self, name: &str) -> Result<(), StoreError> {
            if name.is_empty() {
                self.active = None;
                return Ok(());
            }
            if !self.scripts.contains_key(name) {
                return Err(StoreError::NonExistent);
            }
            self.active = Some(name.to_string());
            Ok(())
        }
        fn rename(&mut self, old: &str, new: &str) -> Result<(), StoreError> {
            let content = self.scripts.remove(old).ok_or(StoreError::NonExistent)?;
            if self.scripts.contains_key(new) {
                self.scripts.insert(old.to_string(), content);
                return Err(StoreError::AlreadyExists);
            }
            self.scripts.insert(new.to_string(), content);
            Ok(())
        }
        fn check_quota(&self, _size: u64) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn test_registry() -> Registry {
        let mut caps = Capabilities::none();
        caps.enable(Extension::Fileinto);
        Registry::new(caps)
    }

    #[test]
    fn parses_putscript_and_getscript() {
        let cmd = parse_command("PUTSCRIPT", vec![Arg::Atom("foo".into()), Arg::Str("keep;".into())]).unwrap();
        assert_eq!(cmd, Command::PutScript { name: "foo".to_string(), content: "keep;".to_string() });
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(parse_command("BOGUS", vec![]).is_err());
    }

    #[test]
    fn putscript_then_getscript_round_trips() {
        let mut store = MemStore::new();
        let registry = test_registry();
        let limits = Limits::default();
        let mut session = Session::new(10);

        let put = session.dispatch(
            "PUTSCRIPT",
            vec![Arg::Atom("foo".into()), Arg::Str("keep;".into())],
            &mut store,
            &registry,
            &limits,
        );
        assert!(matches!(put, Response::Ok { .. }));

        let get = session.dispatch("GETSCRIPT", vec![Arg::Atom("foo".into())], &mut store, &registry, &limits);
        match get {
            Response::Ok { extra_lines, .. } => assert_eq!(extra_lines, vec!["\"keep;\"".to_string()]),
            other => panic!("expected OK, got {other:?}"),
        }
    }

    #[test]
    fn getscript_for_missing_name_is_nonexistent() {
        let mut store = MemStore::new();
        let registry = test_registry();
        let limits = Limits::default();
        let mut session = Session::new(10);

        let response = session.dispatch("GETSCRIPT", vec![Arg::Atom("missing".into())], &mut store, &registry, &limits);
        assert_eq!(response, Response::No { code: Some(ResponseCode::NonExistent), message: "no script named \"missing\"".to_string() });
    }

    #[test]
    fn bad_command_streak_escalates_to_bye() {
        let mut store = MemStore::new();
        let registry = test_registry();
        let limits = Limits::default();
        let mut session = Session::new(3);

        let mut last = Response::ok("warm up");
        for _ in 0..3 {
            last = session.dispatch("BOGUS", vec![], &mut store, &registry, &limits);
        }
        assert!(matches!(last, Response::Bye { .. }));
    }

    #[test]
    fn putscript_with_compile_error_is_rejected_without_storing() {
        let mut store = MemStore::new();
        let registry = test_registry();
        let limits = Limits::default();
        let mut session = Session::new(10);

        let response = session.dispatch(
            "PUTSCRIPT",
            vec![Arg::Atom("bad".into()), Arg::Str("this is not sieve {".into())],
            &mut store,
            &registry,
            &limits,
        );
        assert!(matches!(response, Response::No { .. }));
        assert!(store.get("bad").is_none());
    }
}
