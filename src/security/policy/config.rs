//! The config-driven policy: ordered rules of filters and checkers.

use tracing::warn;

use crate::error::{InvalidArgument, ValidationError, ValidationErrorCode};
use crate::security::command_interest::COMMAND_INTEREST_COMPONENT_COUNT;
use crate::security::policy::{
    data_key_locator_name, interest_key_locator_name, PolicyAction, ValidationPolicy,
};
use crate::security::regex::NdnRegexTopMatcher;
use crate::security::{CertificateRequest, CertificateStorage, ValidationState};
use crate::types::{Data, Interest, Name};

/// How two names must relate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NameRelation {
    Equal,
    IsPrefixOf,
    IsStrictPrefixOf,
}

impl NameRelation {
    /// True if `first` stands in this relation to `second`.
    pub fn holds(self, first: &Name, second: &Name) -> bool {
        match self {
            NameRelation::Equal => first == second,
            NameRelation::IsPrefixOf => first.is_prefix_of(second),
            NameRelation::IsStrictPrefixOf => first.is_prefix_of(second) && first != second,
        }
    }

    fn parse(text: &str) -> Result<Self, InvalidArgument> {
        match text {
            "equal" => Ok(NameRelation::Equal),
            "is-prefix-of" => Ok(NameRelation::IsPrefixOf),
            "is-strict-prefix-of" => Ok(NameRelation::IsStrictPrefixOf),
            other => Err(InvalidArgument::new(format!("unknown name relation \"{other}\""))),
        }
    }
}

/// Selects the packets a rule applies to, by name.
#[derive(Clone, Debug)]
pub enum ConfigFilter {
    Name { name: Name, relation: NameRelation },
    Regex(NdnRegexTopMatcher),
}

impl ConfigFilter {
    pub fn matches(&self, packet_name: &Name) -> bool {
        match self {
            ConfigFilter::Name { name, relation } => relation.holds(name, packet_name),
            ConfigFilter::Regex(regex) => regex.matches(packet_name),
        }
    }
}

/// Constrains the key locator a matched packet may carry.
#[derive(Clone, Debug)]
pub enum ConfigChecker {
    /// The given name must stand in the relation to the key locator name.
    KeyLocatorName { name: Name, relation: NameRelation },
    /// The key locator name must match the regex.
    KeyLocatorRegex(NdnRegexTopMatcher),
    /// Correlates packet and key names: both are matched and expanded, and
    /// the expanded key name must stand in the relation to the expanded
    /// packet name.
    HyperRelation {
        packet_pattern: NdnRegexTopMatcher,
        packet_expansion: String,
        key_pattern: NdnRegexTopMatcher,
        key_expansion: String,
        relation: NameRelation,
    },
}

impl ConfigChecker {
    pub fn accepts(&self, packet_name: &Name, key_locator_name: &Name) -> bool {
        match self {
            ConfigChecker::KeyLocatorName { name, relation } => {
                relation.holds(name, key_locator_name)
            }
            ConfigChecker::KeyLocatorRegex(regex) => regex.matches(key_locator_name),
            ConfigChecker::HyperRelation {
                packet_pattern,
                packet_expansion,
                key_pattern,
                key_expansion,
                relation,
            } => {
                let Some(packet_expanded) = packet_pattern.expand(packet_name, packet_expansion)
                else {
                    return false;
                };
                let Some(key_expanded) = key_pattern.expand(key_locator_name, key_expansion)
                else {
                    return false;
                };
                relation.holds(&key_expanded, &packet_expanded)
            }
        }
    }
}

/// One rule: which packets it covers and what their key locators must
/// satisfy.
#[derive(Clone, Debug)]
pub struct ConfigRule {
    pub id: String,
    pub for_interest: bool,
    pub filters: Vec<ConfigFilter>,
    pub checkers: Vec<ConfigChecker>,
}

impl ConfigRule {
    fn applies_to(&self, packet_name: &Name) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(packet_name))
    }
}

/// A trust-anchor directive found in the configuration.
#[derive(Clone, Debug)]
enum AnchorDirective {
    Any,
    File { path: String, refresh: Option<u64> },
    Directory { path: String, refresh: Option<u64> },
    Base64(String),
}

/// A policy whose rules come from a configuration tree: the first rule
/// matching a packet decides which key locators are acceptable, and
/// `trust-anchor` directives feed the validator's anchor container. A
/// `trust-anchor any` directive short-circuits everything to bypass.
#[derive(Default)]
pub struct ValidationPolicyConfig {
    rules: Vec<ConfigRule>,
    anchors: Vec<AnchorDirective>,
    should_bypass: bool,
    inner: Option<Box<dyn ValidationPolicy>>,
}

impl ValidationPolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads rules and anchor directives from configuration text in the
    /// brace-tree syntax of validator configuration files.
    pub fn load_from_string(&mut self, text: &str) -> Result<(), InvalidArgument> {
        let section = ConfigSection::parse(text)?;
        self.load_from_section(&section)
    }

    /// Loads rules and anchor directives from an already parsed tree.
    pub fn load_from_section(&mut self, section: &ConfigSection) -> Result<(), InvalidArgument> {
        for (key, value) in &section.entries {
            match (key.as_str(), value) {
                ("rule", ConfigValue::Section(rule)) => self.rules.push(parse_rule(rule)?),
                ("trust-anchor", ConfigValue::Section(anchor)) => {
                    let directive = parse_anchor(anchor)?;
                    if matches!(directive, AnchorDirective::Any) {
                        self.should_bypass = true;
                    }
                    self.anchors.push(directive);
                }
                (key, _) => {
                    return Err(InvalidArgument::new(format!(
                        "unexpected top-level config entry \"{key}\""
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[ConfigRule] {
        &self.rules
    }

    fn check(
        &self,
        for_interest: bool,
        packet_name: &Name,
        key_locator_name: Name,
    ) -> Result<PolicyAction, ValidationError> {
        let rule = self
            .rules
            .iter()
            .filter(|rule| rule.for_interest == for_interest)
            .find(|rule| rule.applies_to(packet_name));
        let Some(rule) = rule else {
            return Err(ValidationError::new(
                ValidationErrorCode::PolicyError,
                format!("no rule covers {packet_name}"),
            ));
        };
        if rule
            .checkers
            .iter()
            .any(|checker| checker.accepts(packet_name, &key_locator_name))
        {
            Ok(PolicyAction::Fetch(CertificateRequest::new(Interest::new(
                key_locator_name,
            ))))
        } else {
            Err(ValidationError::new(
                ValidationErrorCode::PolicyError,
                format!(
                    "rule \"{}\" rejects key locator {key_locator_name} for {packet_name}",
                    rule.id
                ),
            ))
        }
    }
}

impl ValidationPolicy for ValidationPolicyConfig {
    fn check_data_policy(
        &mut self,
        data: &Data,
        _state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        if self.should_bypass {
            return Ok(PolicyAction::Bypass);
        }
        self.check(false, data.name(), data_key_locator_name(data)?)
    }

    fn check_interest_policy(
        &mut self,
        interest: &Interest,
        _state: &mut ValidationState,
    ) -> Result<PolicyAction, ValidationError> {
        if self.should_bypass {
            return Ok(PolicyAction::Bypass);
        }
        let packet_name = interest
            .name()
            .get_prefix(-(COMMAND_INTEREST_COMPONENT_COUNT as isize));
        self.check(true, &packet_name, interest_key_locator_name(interest)?)
    }

    fn set_inner_policy(&mut self, policy: Box<dyn ValidationPolicy>) {
        match &mut self.inner {
            Some(inner) => inner.set_inner_policy(policy),
            None => self.inner = Some(policy),
        }
    }

    fn inner_policy_mut(&mut self) -> Option<&mut (dyn ValidationPolicy + 'static)> {
        self.inner.as_deref_mut()
    }

    fn collect_trust_anchors(&mut self, storage: &mut CertificateStorage) {
        for (index, directive) in self.anchors.iter().enumerate() {
            let group = format!("config-group-{index}");
            let loaded = match directive {
                AnchorDirective::Any => Ok(()),
                AnchorDirective::File { path, refresh } => storage
                    .trust_anchors_mut()
                    .insert_dynamic(&group, path, refresh.unwrap_or(3_600_000))
                    .map(|_| ()),
                AnchorDirective::Directory { path, refresh } => storage
                    .trust_anchors_mut()
                    .insert_dynamic(&group, path, refresh.unwrap_or(3_600_000))
                    .map(|_| ()),
                AnchorDirective::Base64(text) => decode_base64_anchor(text).and_then(
                    |certificate| storage.trust_anchors_mut().insert(&group, certificate),
                ),
            };
            if let Err(error) = loaded {
                warn!("cannot load configured trust anchor: {error}");
            }
        }
        if let Some(inner) = self.inner_policy_mut() {
            inner.collect_trust_anchors(storage);
        }
    }
}

fn decode_base64_anchor(
    text: &str,
) -> Result<crate::security::CertificateV2, InvalidArgument> {
    use base64::Engine;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|error| InvalidArgument::new(format!("bad base64 anchor: {error}")))?;
    crate::security::CertificateV2::wire_decode(&bytes)
        .map_err(|error| InvalidArgument::new(format!("bad anchor certificate: {error}")))
}

// ---- tree construction ----

fn parse_rule(section: &ConfigSection) -> Result<ConfigRule, InvalidArgument> {
    let id = section
        .value("id")
        .ok_or_else(|| InvalidArgument::new("rule without an id"))?
        .to_string();
    let for_interest = match section.value("for") {
        Some("data") => false,
        Some("interest") => true,
        _ => return Err(InvalidArgument::new(format!("rule \"{id}\" needs for data|interest"))),
    };
    let mut filters = Vec::new();
    let mut checkers = Vec::new();
    for (key, value) in &section.entries {
        match (key.as_str(), value) {
            ("filter", ConfigValue::Section(filter)) => filters.push(parse_filter(filter)?),
            ("checker", ConfigValue::Section(checker)) => checkers.push(parse_checker(checker)?),
            _ => {}
        }
    }
    if checkers.is_empty() {
        return Err(InvalidArgument::new(format!("rule \"{id}\" has no checkers")));
    }
    Ok(ConfigRule { id, for_interest, filters, checkers })
}

fn parse_filter(section: &ConfigSection) -> Result<ConfigFilter, InvalidArgument> {
    if section.value("type") != Some("name") {
        return Err(InvalidArgument::new("only name filters are supported"));
    }
    if let Some(pattern) = section.value("regex") {
        return Ok(ConfigFilter::Regex(NdnRegexTopMatcher::new(pattern)?));
    }
    let name = section
        .value("name")
        .ok_or_else(|| InvalidArgument::new("name filter without a name"))?;
    let relation = section
        .value("relation")
        .ok_or_else(|| InvalidArgument::new("name filter without a relation"))?;
    Ok(ConfigFilter::Name {
        name: Name::from_uri(name)?,
        relation: NameRelation::parse(relation)?,
    })
}

fn parse_checker(section: &ConfigSection) -> Result<ConfigChecker, InvalidArgument> {
    let key_locator = section
        .section("key-locator")
        .ok_or_else(|| InvalidArgument::new("checker without a key-locator"))?;
    match key_locator.value("type") {
        Some("name") => {
            if let Some(pattern) = key_locator.value("regex") {
                return Ok(ConfigChecker::KeyLocatorRegex(NdnRegexTopMatcher::new(pattern)?));
            }
            let name = key_locator
                .value("name")
                .ok_or_else(|| InvalidArgument::new("key-locator name checker without a name"))?;
            let relation = key_locator.value("relation").ok_or_else(|| {
                InvalidArgument::new("key-locator name checker without a relation")
            })?;
            Ok(ConfigChecker::KeyLocatorName {
                name: Name::from_uri(name)?,
                relation: NameRelation::parse(relation)?,
            })
        }
        Some("hyper-relation") => {
            let field = |key: &str| {
                key_locator.value(key).ok_or_else(|| {
                    InvalidArgument::new(format!("hyper-relation checker without {key}"))
                })
            };
            Ok(ConfigChecker::HyperRelation {
                packet_pattern: NdnRegexTopMatcher::new(field("p-regex")?)?,
                packet_expansion: field("p-expand")?.to_string(),
                key_pattern: NdnRegexTopMatcher::new(field("k-regex")?)?,
                key_expansion: field("k-expand")?.to_string(),
                relation: NameRelation::parse(field("h-relation")?)?,
            })
        }
        _ => Err(InvalidArgument::new("key-locator checker needs type name|hyper-relation")),
    }
}

fn parse_anchor(section: &ConfigSection) -> Result<AnchorDirective, InvalidArgument> {
    match section.value("type") {
        Some("any") => Ok(AnchorDirective::Any),
        Some("file") => Ok(AnchorDirective::File {
            path: section
                .value("file-name")
                .ok_or_else(|| InvalidArgument::new("file anchor without file-name"))?
                .to_string(),
            refresh: parse_refresh(section)?,
        }),
        Some("dir") => Ok(AnchorDirective::Directory {
            path: section
                .value("dir")
                .ok_or_else(|| InvalidArgument::new("dir anchor without dir"))?
                .to_string(),
            refresh: parse_refresh(section)?,
        }),
        Some("base64") => Ok(AnchorDirective::Base64(
            section
                .value("base64-string")
                .ok_or_else(|| InvalidArgument::new("base64 anchor without base64-string"))?
                .to_string(),
        )),
        _ => Err(InvalidArgument::new("trust-anchor needs type any|file|dir|base64")),
    }
}

/// Parses `refresh` values like `1h`, `10m`, `30s` or plain seconds.
fn parse_refresh(section: &ConfigSection) -> Result<Option<u64>, InvalidArgument> {
    let Some(text) = section.value("refresh") else {
        return Ok(None);
    };
    let (digits, unit_ms) = match text.as_bytes().last() {
        Some(b'h') => (&text[..text.len() - 1], 3_600_000),
        Some(b'm') => (&text[..text.len() - 1], 60_000),
        Some(b's') => (&text[..text.len() - 1], 1000),
        _ => (text, 1000),
    };
    let count: u64 = digits
        .parse()
        .map_err(|_| InvalidArgument::new(format!("bad refresh value \"{text}\"")))?;
    Ok(Some(count * unit_ms))
}

// ---- the configuration tree ----

/// A parsed configuration section: ordered key/value entries where a
/// value is either a token or a nested section.
#[derive(Clone, Debug, Default)]
pub struct ConfigSection {
    pub entries: Vec<(String, ConfigValue)>,
}

#[derive(Clone, Debug)]
pub enum ConfigValue {
    Value(String),
    Section(ConfigSection),
}

impl ConfigSection {
    /// Parses the brace-tree syntax:
    ///
    /// ```text
    /// rule
    /// {
    ///   id "example"
    ///   for data
    ///   checker { type customized key-locator { type name name /x relation equal } }
    /// }
    /// ```
    pub fn parse(text: &str) -> Result<Self, InvalidArgument> {
        let tokens = tokenize(text);
        let mut at = 0;
        let section = parse_section_body(&tokens, &mut at, false)?;
        if at != tokens.len() {
            return Err(InvalidArgument::new("unbalanced '}' in configuration"));
        }
        Ok(section)
    }

    /// The first plain value under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match v {
            ConfigValue::Value(value) if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// The first nested section under `key`.
    pub fn section(&self, key: &str) -> Option<&ConfigSection> {
        self.entries.iter().find_map(|(k, v)| match v {
            ConfigValue::Section(section) if k == key => Some(section),
            _ => None,
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ';' => { /* entry terminator, insignificant */ }
            '{' | '}' => tokens.push(c.to_string()),
            '"' => {
                let mut token = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    token.push(c);
                }
                tokens.push(token);
            }
            c if c.is_whitespace() => {}
            c => {
                let mut token = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '{' || next == '}' || next == ';' {
                        break;
                    }
                    token.push(next);
                    chars.next();
                }
                tokens.push(token);
            }
        }
    }
    tokens
}

fn parse_section_body(
    tokens: &[String],
    at: &mut usize,
    nested: bool,
) -> Result<ConfigSection, InvalidArgument> {
    let mut section = ConfigSection::default();
    loop {
        match tokens.get(*at).map(String::as_str) {
            None => {
                if nested {
                    return Err(InvalidArgument::new("missing '}' in configuration"));
                }
                return Ok(section);
            }
            Some("}") => {
                if !nested {
                    return Ok(section);
                }
                *at += 1;
                return Ok(section);
            }
            Some("{") => return Err(InvalidArgument::new("unexpected '{' in configuration")),
            Some(key) => {
                *at += 1;
                match tokens.get(*at).map(String::as_str) {
                    Some("{") => {
                        *at += 1;
                        let nested_section = parse_section_body(tokens, at, true)?;
                        section
                            .entries
                            .push((key.to_string(), ConfigValue::Section(nested_section)));
                    }
                    Some(value) => {
                        *at += 1;
                        if tokens.get(*at).map(String::as_str) == Some("{") {
                            // `key value { ... }` is not in this grammar.
                            return Err(InvalidArgument::new(format!(
                                "unexpected '{{' after \"{key} {value}\""
                            )));
                        }
                        section
                            .entries
                            .push((key.to_string(), ConfigValue::Value(value.to_string())));
                    }
                    None => {
                        return Err(InvalidArgument::new(format!(
                            "configuration key \"{key}\" without a value"
                        )))
                    }
                }
            }
        }
    }
}
