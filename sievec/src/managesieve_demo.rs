//! `sievec serve`: a ManageSieve session driven over stdin/stdout (RFC 5804
//! demo), backing [`sieve_engine::managesieve::commands::ScriptStore`] with
//! an in-process map rather than a real mail store.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use sieve_engine::managesieve::commands::{ScriptStore, Session, StoreError};
use sieve_engine::managesieve::parser::{read_word, Parser, ReadArgsResult};
use sieve_engine::registry::{Capabilities, Registry};
use sieve_types::Limits;

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

    fn check_quota(&self, size: u64) -> Result<(), StoreError> {
        if size > 1024 * 1024 {
            return Err(StoreError::QuotaMaxSize);
        }
        Ok(())
    }
}

pub fn serve() -> Result<(), String> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let limits = Limits::default();
    let registry = Registry::new(Capabilities::all_compiled_in());
    let parser = Parser::new(limits.max_line_length);
    let mut session = Session::new(limits.max_bad_commands);
    let mut store = MemStore::new();

    write_line(&mut out, "\"IMPLEMENTATION\" \"sieve-engine\"")?;
    write_line(&mut out, "OK \"ready\"")?;

    let mut buf: Vec<u8> = Vec::new();
    let mut reader = stdin.lock();
    let mut continuation_sent = false;

    loop {
        let chunk = read_chunk(&mut reader)?;
        if chunk.is_empty() {
            return Ok(());
        }
        buf.extend_from_slice(&chunk);

        let Some((name, name_len)) = read_word(&buf) else {
            continue;
        };

        match parser.read_args(&buf[name_len..], continuation_sent) {
            ReadArgsResult::Args(args, consumed) => {
                buf.drain(..name_len + consumed);
                continuation_sent = false;
                let response = session.dispatch(&name, args, &mut store, &registry, &limits);
                out.write_all(response.render().as_bytes()).map_err(|e| e.to_string())?;
                out.flush().map_err(|e| e.to_string())?;
                if matches!(response, sieve_engine::managesieve::commands::Response::Bye { .. }) {
                    return Ok(());
                }
            }
            ReadArgsResult::NeedMoreData => continue,
            ReadArgsResult::NeedContinuation => {
                write_line(&mut out, "+ \"go ahead\"")?;
                continuation_sent = true;
            }
            ReadArgsResult::Streaming { .. } => {
                // This demo host never configures a stream threshold, so
                // the parser never produces this variant.
                unreachable!("demo parser has no stream threshold configured")
            }
            ReadArgsResult::Fatal(e) => {
                write_line(&mut out, &format!("BYE \"{e}\""))?;
                return Ok(());
            }
            ReadArgsResult::Error(e) => {
                write_line(&mut out, &format!("NO \"{e}\""))?;
                buf.clear();
                continuation_sent = false;
            }
        }
    }
}

fn read_chunk(reader: &mut impl BufRead) -> Result<Vec<u8>, String> {
    let filled = reader.fill_buf().map_err(|e| e.to_string())?;
    let chunk = filled.to_vec();
    let len = chunk.len();
    reader.consume(len);
    Ok(chunk)
}

fn write_line(out: &mut impl Write, line: &str) -> Result<(), String> {
    writeln!(out, "{line}\r").map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}
