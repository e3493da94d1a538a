use async_trait::async_trait;
use dnsproxy_application::ports::{FirewallPort, UpstreamExchanger};
use dnsproxy_domain::{ChainRef, DomainError, FirewallChange, NatRule, RuleBatch, TableRef};
use hickory_proto::op::{Message, MessageType};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum UpstreamBehavior {
    /// Answer the question with an A record, same id as the query.
    Answer(Ipv4Addr),
    /// Return these bytes whatever the query was.
    Raw(Vec<u8>),
    /// Answer with a reply whose id is off by one.
    WrongId,
    Fail(DomainError),
}

#[derive(Clone)]
pub struct MockUpstream {
    behavior: Arc<Mutex<UpstreamBehavior>>,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    last_reply: Arc<Mutex<Option<Vec<u8>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn new(behavior: UpstreamBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            received: Arc::new(Mutex::new(Vec::new())),
            last_reply: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn answering(addr: Ipv4Addr) -> Self {
        Self::new(UpstreamBehavior::Answer(addr))
    }

    pub fn failing(error: DomainError) -> Self {
        Self::new(UpstreamBehavior::Fail(error))
    }

    pub fn set_behavior(&self, behavior: UpstreamBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }

    pub fn last_reply(&self) -> Option<Vec<u8>> {
        self.last_reply.lock().unwrap().clone()
    }

    fn answer(query: &[u8], addr: Ipv4Addr, id_delta: u16) -> Result<Vec<u8>, DomainError> {
        let request =
            Message::from_vec(query).map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))?;
        let mut reply = Message::new();
        reply
            .set_id(request.id().wrapping_add(id_delta))
            .set_message_type(MessageType::Response)
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true);
        for query in request.queries() {
            reply.add_query(query.clone());
            reply.add_answer(Record::from_rdata(
                query.name().clone(),
                300,
                RData::A(A(addr)),
            ));
        }
        reply
            .to_vec()
            .map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))
    }
}

#[async_trait]
impl UpstreamExchanger for MockUpstream {
    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(query.to_vec());

        let behavior = self.behavior.lock().unwrap().clone();
        let reply = match behavior {
            UpstreamBehavior::Answer(addr) => Self::answer(query, addr, 0)?,
            UpstreamBehavior::Raw(bytes) => bytes,
            UpstreamBehavior::WrongId => Self::answer(query, Ipv4Addr::new(203, 0, 113, 1), 1)?,
            UpstreamBehavior::Fail(error) => return Err(error),
        };

        *self.last_reply.lock().unwrap() = Some(reply.clone());
        Ok(reply)
    }

    fn server(&self) -> String {
        "mock-upstream".to_string()
    }
}

type Ruleset = HashMap<TableRef, HashMap<String, Vec<NatRule>>>;

/// Packet filter kept in memory with the same all-or-nothing commit rule as
/// the kernel.
#[derive(Clone, Default)]
pub struct InMemoryFirewall {
    ruleset: Arc<Mutex<Ruleset>>,
    fail_with: Arc<Mutex<Option<DomainError>>>,
    commits: Arc<AtomicUsize>,
}

impl InMemoryFirewall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following commit is rejected with `error` until cleared.
    pub fn fail_commits_with(&self, error: Option<DomainError>) {
        *self.fail_with.lock().unwrap() = error;
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rules_in(&self, chain: &ChainRef) -> Vec<NatRule> {
        self.ruleset
            .lock()
            .unwrap()
            .get(&chain.table)
            .and_then(|chains| chains.get(&chain.name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_chain(&self, chain: &ChainRef) -> bool {
        self.ruleset
            .lock()
            .unwrap()
            .get(&chain.table)
            .map(|chains| chains.contains_key(&chain.name))
            .unwrap_or(false)
    }

    fn not_found(chain: &ChainRef) -> DomainError {
        DomainError::ChainNotFound {
            table: chain.table.name.clone(),
            chain: chain.name.clone(),
        }
    }

    fn apply(ruleset: &mut Ruleset, change: &FirewallChange) -> Result<(), DomainError> {
        match change {
            FirewallChange::AddTable(table) => {
                ruleset.entry(table.clone()).or_default();
            }
            FirewallChange::AddChain(spec) => {
                let chains = ruleset.get_mut(&spec.chain.table).ok_or_else(|| {
                    DomainError::FirewallCommit(format!("no table {}", spec.chain.table.name))
                })?;
                chains.entry(spec.chain.name.clone()).or_default();
            }
            FirewallChange::FlushChain(chain) => {
                ruleset
                    .get_mut(&chain.table)
                    .and_then(|chains| chains.get_mut(&chain.name))
                    .ok_or_else(|| Self::not_found(chain))?
                    .clear();
            }
            FirewallChange::AddRule(rule) => {
                ruleset
                    .get_mut(&rule.chain.table)
                    .and_then(|chains| chains.get_mut(&rule.chain.name))
                    .ok_or_else(|| Self::not_found(&rule.chain))?
                    .push(rule.clone());
            }
            FirewallChange::DeleteChain(chain) => {
                ruleset
                    .get_mut(&chain.table)
                    .and_then(|chains| chains.remove(&chain.name))
                    .ok_or_else(|| Self::not_found(chain))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FirewallPort for InMemoryFirewall {
    async fn commit(&self, batch: &RuleBatch) -> Result<(), DomainError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_with.lock().unwrap().clone() {
            return Err(error);
        }

        let mut ruleset = self.ruleset.lock().unwrap();
        let mut staged = ruleset.clone();
        for change in batch.changes() {
            Self::apply(&mut staged, change)?;
        }
        *ruleset = staged;
        Ok(())
    }

    async fn list_chains(&self, table: &TableRef) -> Result<Vec<String>, DomainError> {
        Ok(self
            .ruleset
            .lock()
            .unwrap()
            .get(table)
            .map(|chains| chains.keys().cloned().collect())
            .unwrap_or_default())
    }
}
