//! Credential generation by reference.
//!
//! A [`SecretStore`] never holds a password in process memory before use.
//! It declares a Secret resource carrying the generation policy and hands
//! back a [`Credential`] whose password is a deferred attribute, resolved
//! only when the provider materializes the secret at synthesis time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};

use crate::error::{ComposeError, ComposeResult};

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const WHITESPACE: &str = " ";

/// Minimum acceptable password entropy in bits.
pub const MIN_ENTROPY_BITS: f64 = 64.0;

/// Character-class policy for generated passwords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Password length in characters.
    pub length: usize,
    /// Drop punctuation from the character set.
    pub exclude_punctuation: bool,
    /// Drop whitespace from the character set.
    pub exclude_whitespace: bool,
    /// Additional characters to drop.
    pub exclude_characters: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: 32,
            exclude_punctuation: false,
            exclude_whitespace: true,
            exclude_characters: String::new(),
        }
    }
}

impl PasswordPolicy {
    /// The character set this policy permits.
    pub fn charset(&self) -> String {
        let mut charset = String::new();
        charset.push_str(UPPER);
        charset.push_str(LOWER);
        charset.push_str(DIGITS);
        if !self.exclude_punctuation {
            charset.push_str(PUNCTUATION);
        }
        if !self.exclude_whitespace {
            charset.push_str(WHITESPACE);
        }
        charset
            .chars()
            .filter(|c| !self.exclude_characters.contains(*c))
            .collect()
    }

    /// Entropy in bits of a password drawn uniformly from the charset.
    pub fn entropy_bits(&self) -> f64 {
        let size = self.charset().chars().count();
        if size == 0 {
            return 0.0;
        }
        self.length as f64 * (size as f64).log2()
    }

    /// Check the policy can produce a password of the required entropy.
    pub fn validate(&self) -> ComposeResult<()> {
        let bits = self.entropy_bits();
        if bits < MIN_ENTROPY_BITS {
            return Err(ComposeError::PolicyViolation(format!(
                "policy yields {bits:.1} bits of entropy, {MIN_ENTROPY_BITS} required"
            )));
        }
        Ok(())
    }
}

/// A generated credential. The password is a deferred attribute pointing
/// at the secret resource's `password` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub username: Attribute,
    pub password: Attribute,
    /// Id of the Secret resource backing the password.
    pub secret_id: String,
}

/// Declares secret resources and caches issued credentials.
///
/// A credential is generated once per name: asking again returns the same
/// credential and declares nothing new.
#[derive(Debug, Default)]
pub struct SecretStore {
    policy: PasswordPolicy,
    issued: HashMap<String, Credential>,
}

impl SecretStore {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self {
            policy,
            issued: HashMap::new(),
        }
    }

    /// Generate a credential named `name` for `username`, declaring its
    /// backing Secret resource into the graph.
    ///
    /// Fails with [`ComposeError::PolicyViolation`] if the policy cannot
    /// produce a password of the minimum required entropy.
    pub fn generate(
        &mut self,
        graph: &mut DependencyGraph,
        name: &str,
        username: &str,
    ) -> ComposeResult<Credential> {
        if let Some(existing) = self.issued.get(name) {
            debug!("Returning previously issued credential: {}", name);
            return Ok(existing.clone());
        }
        self.policy.validate()?;

        let secret_id = format!("secret-{name}");
        graph.add_resource(
            Resource::new(&secret_id, ResourceKind::Secret)
                .with_config("username", Attribute::literal(username))
                .with_config("length", Attribute::literal(self.policy.length))
                .with_config("charset", Attribute::literal(self.policy.charset())),
        )?;

        let credential = Credential {
            username: Attribute::literal(username),
            password: Attribute::deferred(&secret_id, "password"),
            secret_id,
        };
        self.issued.insert(name.to_string(), credential.clone());
        Ok(credential)
    }

    /// A previously issued credential, if any.
    pub fn get(&self, name: &str) -> Option<&Credential> {
        self.issued.get(name)
    }
}
