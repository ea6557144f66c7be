//! The extension registry.
//!
//! A closed enum names every extension this crate knows how to compile and
//! run (forward extensibility is available only per the definition traits
//! below; trait objects stand in for anything a third party might add).
//! `require` resolves names against a `Registry`;
//! an engine's configured [`Capabilities`] intersects with what a script
//! asks for.

use std::collections::BTreeMap;
use std::fmt;

use sieve_types::ExtensionId;

/// One compiled-in extension. Ordered (`Ord`) so iteration over a
/// `Capabilities` set is deterministic — codegen's extension table depends
/// on this for byte-identical repeat compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extension {
    Fileinto,
    Envelope,
    Variables,
    Copy,
    Reject,
    Imap4Flags,
    Body,
    Relational,
    Subaddress,
    Vacation,
    Include,
    Regex,
    Date,
    Index,
    Mailbox,
}

impl Extension {
    pub fn name(self) -> &'static str {
        match self {
            Extension::Fileinto => "fileinto",
            Extension::Envelope => "envelope",
            Extension::Variables => "variables",
            Extension::Copy => "copy",
            Extension::Reject => "reject",
            Extension::Imap4Flags => "imap4flags",
            Extension::Body => "body",
            Extension::Relational => "relational",
            Extension::Subaddress => "subaddress",
            Extension::Vacation => "vacation",
            Extension::Include => "include",
            Extension::Regex => "regex",
            Extension::Date => "date",
            Extension::Index => "index",
            Extension::Mailbox => "mailbox",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "fileinto" => Extension::Fileinto,
            "envelope" => Extension::Envelope,
            "variables" => Extension::Variables,
            "copy" => Extension::Copy,
            "reject" | "ereject" => Extension::Reject,
            "imap4flags" => Extension::Imap4Flags,
            "body" => Extension::Body,
            "relational" => Extension::Relational,
            "subaddress" => Extension::Subaddress,
            "vacation" => Extension::Vacation,
            "include" => Extension::Include,
            "regex" => Extension::Regex,
            "date" => Extension::Date,
            "index" => Extension::Index,
            "mailbox" => Extension::Mailbox,
            _ => return None,
        })
    }

    /// All extensions this build of the crate was compiled with (Cargo
    /// feature -> extension, one `ext_*` flag per forwarded extension).
    pub fn compiled_in() -> Vec<Extension> {
        #[allow(unused_mut)]
        let mut out = Vec::new();
        #[cfg(feature = "ext_fileinto")]
        out.push(Extension::Fileinto);
        #[cfg(feature = "ext_envelope")]
        out.push(Extension::Envelope);
        #[cfg(feature = "ext_variables")]
        out.push(Extension::Variables);
        #[cfg(feature = "ext_copy")]
        out.push(Extension::Copy);
        #[cfg(feature = "ext_reject")]
        out.push(Extension::Reject);
        #[cfg(feature = "ext_imap4flags")]
        out.push(Extension::Imap4Flags);
        #[cfg(feature = "ext_body")]
        out.push(Extension::Body);
        #[cfg(feature = "ext_relational")]
        out.push(Extension::Relational);
        #[cfg(feature = "ext_subaddress")]
        out.push(Extension::Subaddress);
        #[cfg(feature = "ext_vacation")]
        out.push(Extension::Vacation);
        #[cfg(feature = "ext_include")]
        out.push(Extension::Include);
        #[cfg(feature = "ext_regex")]
        out.push(Extension::Regex);
        #[cfg(feature = "ext_date")]
        out.push(Extension::Date);
        #[cfg(feature = "ext_index")]
        out.push(Extension::Index);
        #[cfg(feature = "ext_mailbox")]
        out.push(Extension::Mailbox);
        out.sort();
        out
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The set of extensions a particular engine instance makes available.
/// Requesting an extension outside this set is a compile error even if the
/// registry knows its name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    enabled: BTreeMap<Extension, ()>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all_compiled_in() -> Self {
        let mut caps = Self::default();
        for ext in Extension::compiled_in() {
            caps.enable(ext);
        }
        caps
    }

    pub fn enable(&mut self, ext: Extension) -> &mut Self {
        self.enabled.insert(ext, ());
        self
    }

    pub fn is_enabled(&self, ext: Extension) -> bool {
        self.enabled.contains_key(&ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = Extension> + '_ {
        self.enabled.keys().copied()
    }
}

/// The per-compilation registry: maps [`Extension`] to the compile-time
/// [`ExtensionId`] codegen and the validator address it by. Ids start at 1
/// (0 is [`ExtensionId::CORE`]) and are assigned in the deterministic order
/// of [`Extension`]'s `Ord` so repeat compiles agree.
#[derive(Debug, Clone)]
pub struct Registry {
    capabilities: Capabilities,
    ids: BTreeMap<Extension, ExtensionId>,
}

impl Registry {
    pub fn new(capabilities: Capabilities) -> Self {
        let mut ids = BTreeMap::new();
        let mut next = 1u16;
        for ext in capabilities.iter() {
            ids.insert(ext, ExtensionId(next));
            next += 1;
        }
        Self { capabilities, ids }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn id_of(&self, ext: Extension) -> Option<ExtensionId> {
        self.ids.get(&ext).copied()
    }

    pub fn by_id(&self, id: ExtensionId) -> Option<Extension> {
        self.ids.iter().find(|(_, v)| **v == id).map(|(k, _)| *k)
    }

    /// `require "name"` resolution: the name must be a known
    /// extension name, core command/test, or core match-type/comparator
    /// name (`"fileinto"`, `"comparator-i;ascii-numeric"`, ...), and it must
    /// be within this registry's activated capability set.
    pub fn resolve_require(&self, name: &str) -> RequireResolution {
        match Extension::from_name(name) {
            Some(ext) if self.capabilities.is_enabled(ext) => RequireResolution::Ok(ext),
            Some(_) => RequireResolution::NotEnabled,
            None => RequireResolution::Unknown,
        }
    }

    /// Extensions in deterministic id order, for the binary extension table.
    pub fn ordered_extensions(&self) -> Vec<(ExtensionId, Extension)> {
        self.ids.iter().map(|(ext, id)| (*id, *ext)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireResolution {
    Ok(Extension),
    /// Known name, but not in this engine instance's [`Capabilities`].
    NotEnabled,
    /// Not a recognized extension name at all.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_resolution_distinguishes_unknown_from_not_enabled() {
        let mut caps = Capabilities::none();
        caps.enable(Extension::Fileinto);
        let registry = Registry::new(caps);
        assert_eq!(
            registry.resolve_require("fileinto"),
            RequireResolution::Ok(Extension::Fileinto)
        );
        assert_eq!(registry.resolve_require("vacation"), RequireResolution::NotEnabled);
        assert_eq!(registry.resolve_require("not-a-real-extension"), RequireResolution::Unknown);
    }

    #[test]
    fn extension_ids_assigned_in_deterministic_order() {
        let mut caps = Capabilities::none();
        caps.enable(Extension::Vacation);
        caps.enable(Extension::Fileinto);
        let registry = Registry::new(caps);
        // Fileinto < Vacation per the enum's declared Ord, regardless of
        // insertion order.
        assert_eq!(registry.id_of(Extension::Fileinto), Some(ExtensionId(1)));
        assert_eq!(registry.id_of(Extension::Vacation), Some(ExtensionId(2)));
    }
}
