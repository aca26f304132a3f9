//! Input plans: what to type into a matched form, one search at a time.
//!
//! A [`PlanGenerator`] is built once from the crawl config and validated up
//! front. Every call to [`PlanGenerator::plans`] starts a fresh lazy
//! [`InputPlans`] iterator; the exhaustive `character_iteration` mode never
//! materializes its Cartesian product.

mod escape;

pub use escape::{split_unescaped, unescape};

use crate::config::{CrawlConfig, InputType};
use crate::{Error, Result};
use std::fmt;

const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// One field/value pair to fill before submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputAssignment {
    pub field_index: usize,
    pub value: String,
}

impl InputAssignment {
    pub fn new(field_index: usize, value: impl Into<String>) -> Self {
        Self {
            field_index,
            value: value.into(),
        }
    }
}

/// The assignments for a single independent search attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputPlan {
    pub assignments: Vec<InputAssignment>,
}

impl InputPlan {
    /// A plan filling one field.
    pub fn single(field_index: usize, value: impl Into<String>) -> Self {
        Self {
            assignments: vec![InputAssignment::new(field_index, value)],
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl fmt::Display for InputPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, a) in self.assignments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", a.field_index, a.value)?;
        }
        f.write_str("]")
    }
}

/// Validated input strategy.
#[derive(Debug, Clone)]
pub enum PlanGenerator {
    /// No strategy configured; yields nothing.
    Disabled,
    /// Exhaustive strings over an alphabet.
    Characters {
        alphabet: Vec<char>,
        length: usize,
        wildcard: Option<String>,
        field_index: usize,
    },
    /// Plans parsed from `fixed_strings` or `multi_manual` text.
    Listed(Vec<InputPlan>),
}

impl PlanGenerator {
    /// Build the generator, rejecting strategy/payload mismatches.
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        let Some(input_type) = config.input_type else {
            return Ok(Self::Disabled);
        };
        match input_type {
            InputType::CharacterIteration => {
                let alphabet: Vec<char> = config
                    .form_input_range
                    .as_deref()
                    .unwrap_or(DEFAULT_ALPHABET)
                    .chars()
                    .collect();
                if alphabet.is_empty() {
                    return Err(Error::Config(
                        "crawl.form_input_range must not be empty".into(),
                    ));
                }
                Ok(Self::Characters {
                    alphabet,
                    length: config.input_min_length,
                    wildcard: config.wildcard.clone(),
                    field_index: config.form_input_index,
                })
            }
            InputType::FixedStrings => {
                let payload = require_payload(config, "fixed_strings")?;
                Ok(Self::Listed(parse_fixed_strings(
                    payload,
                    config.form_input_index,
                )))
            }
            InputType::MultiManual => {
                let payload = require_payload(config, "multi_manual")?;
                Ok(Self::Listed(parse_multi_manual(payload)?))
            }
        }
    }

    /// Start a new pass over the plans.
    pub fn plans(&self) -> InputPlans {
        let inner = match self {
            Self::Disabled => Inner::Listed(Vec::new().into_iter()),
            Self::Characters {
                alphabet,
                length,
                wildcard,
                field_index,
            } => Inner::Characters(CharacterIteration {
                alphabet: alphabet.clone(),
                digits: vec![0; *length],
                wildcard: wildcard.clone(),
                field_index: *field_index,
                done: false,
            }),
            Self::Listed(plans) => Inner::Listed(plans.clone().into_iter()),
        };
        InputPlans { inner }
    }
}

fn require_payload<'a>(config: &'a CrawlConfig, mode: &str) -> Result<&'a str> {
    config.input_strings.as_deref().ok_or_else(|| {
        Error::Config(format!(
            "crawl.input_strings is required for input_type {}",
            mode
        ))
    })
}

/// `a,b\,c` -> one plan per value, each filling `field_index`.
pub fn parse_fixed_strings(payload: &str, field_index: usize) -> Vec<InputPlan> {
    split_unescaped(payload, ',')
        .into_iter()
        .map(|raw| InputPlan::single(field_index, unescape(raw, &[','])))
        .collect()
}

/// `0:foo,1:bar;0:baz` -> one plan per `;` group.
pub fn parse_multi_manual(payload: &str) -> Result<Vec<InputPlan>> {
    let mut plans = Vec::new();
    for group in split_unescaped(payload, ';') {
        if group.trim().is_empty() {
            continue;
        }
        let mut plan = InputPlan::default();
        for entry in split_unescaped(group, ',') {
            let (index, value) = entry.split_once(':').ok_or_else(|| {
                Error::Config(format!(
                    "invalid multi_manual entry '{}', expected <field>:<value>",
                    entry
                ))
            })?;
            let field_index = index.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!(
                    "invalid field index '{}' in multi_manual entry '{}'",
                    index, entry
                ))
            })?;
            plan.assignments.push(InputAssignment::new(
                field_index,
                unescape(value, &[',', ';']),
            ));
        }
        plans.push(plan);
    }
    Ok(plans)
}

/// Lazy sequence of plans.
#[derive(Debug)]
pub struct InputPlans {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Characters(CharacterIteration),
    Listed(std::vec::IntoIter<InputPlan>),
}

impl Iterator for InputPlans {
    type Item = InputPlan;

    fn next(&mut self) -> Option<InputPlan> {
        match &mut self.inner {
            Inner::Characters(it) => it.next(),
            Inner::Listed(it) => it.next(),
        }
    }
}

/// Base-N counter over the alphabet, most significant digit first.
#[derive(Debug)]
struct CharacterIteration {
    alphabet: Vec<char>,
    digits: Vec<usize>,
    wildcard: Option<String>,
    field_index: usize,
    done: bool,
}

impl CharacterIteration {
    fn next(&mut self) -> Option<InputPlan> {
        if self.done {
            return None;
        }
        let mut value: String = self.digits.iter().map(|&d| self.alphabet[d]).collect();
        if let Some(ref wildcard) = self.wildcard {
            value.push_str(wildcard);
        }

        // Carry out of the top digit means every combination was produced.
        self.done = true;
        for digit in self.digits.iter_mut().rev() {
            *digit += 1;
            if *digit < self.alphabet.len() {
                self.done = false;
                break;
            }
            *digit = 0;
        }

        Some(InputPlan::single(self.field_index, value))
    }
}
