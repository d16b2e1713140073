use crate::config::Config;
use crate::error::ConfigError;
use crate::extractor::{EndUser, Rule};
use async_trait::async_trait;
use htcollector::attributes::{string_attribute, to_text, unindexed_key, AttributesExt};
use htcollector::proto::trace::{Span, TracesData};
use htcollector::{BatchContext, Capabilities, Processor, ProcessorResult, TracesProcessor};
use std::collections::HashMap;

/// Span attribute holding the user id.
pub const ENDUSER_ID: &str = "enduser.id";
/// Span attribute holding the user role.
pub const ENDUSER_ROLE: &str = "enduser.role";
/// Span attribute holding the user scope.
pub const ENDUSER_SCOPE: &str = "enduser.scope";
/// Span attribute holding the session identifier.
pub const SESSION_ID: &str = "session.id";

/// Derives `enduser.*` and `session.id` attributes from authentication
/// headers, cookies and request bodies.
///
/// Attributes already present on a span are never overwritten.
#[derive(Debug)]
pub struct EndUserProcessor {
    rules: HashMap<String, Vec<Rule>>,
}

impl EndUserProcessor {
    /// Builds the processor, compiling every rule.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let mut rules: HashMap<String, Vec<Rule>> = HashMap::new();
        for end_user in config.end_users {
            let rule = Rule::new(end_user)?;
            rules.entry(rule.key().to_string()).or_default().push(rule);
        }
        Ok(EndUserProcessor { rules })
    }

    fn extract(&self, span: &Span) -> EndUser {
        let mut user = EndUser::default();
        for attribute in &span.attributes {
            let Some(rules) = self.rules.get(unindexed_key(&attribute.key)) else {
                continue;
            };
            let Some(value) = attribute.value.as_ref().map(to_text) else {
                continue;
            };
            for rule in rules.iter().filter(|rule| rule.applies(&span.attributes)) {
                rule.extract(&attribute.key, &value, &mut user);
            }
        }
        user
    }
}

#[async_trait]
impl Processor for EndUserProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::MUTATING
    }
}

#[async_trait]
impl TracesProcessor for EndUserProcessor {
    async fn process_traces(
        &self,
        _cx: &mut BatchContext,
        traces: &mut TracesData,
    ) -> ProcessorResult<()> {
        if self.rules.is_empty() {
            return Ok(());
        }
        for resource_spans in traces.resource_spans.iter_mut() {
            for scope_spans in resource_spans.scope_spans.iter_mut() {
                for span in scope_spans.spans.iter_mut() {
                    let user = self.extract(span);
                    if user.is_empty() {
                        continue;
                    }
                    let fragments = [
                        (ENDUSER_ID, user.id),
                        (ENDUSER_ROLE, user.role),
                        (ENDUSER_SCOPE, user.scope),
                        (SESSION_ID, user.session),
                    ];
                    for (key, value) in fragments {
                        if let Some(value) = value {
                            span.attributes.insert_if_absent(string_attribute(key, value));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
