//! Static pattern registry for marketplaces and agent sites.
//!
//! Every marketplace and agent has an ordered list of rules; the first rule
//! that matches wins. For agents, bespoke path/code rules are listed before
//! the generic `url=` style rules, and that order is part of the contract.
//!
//! The registry is compiled once on first use and is read-only afterwards,
//! so it can be shared freely across tasks and threads.

use crate::domain::{Agent, Platform};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Private code table of an agent: token (matched ignoring ASCII case) to platform.
pub type CodeTable = &'static [(&'static str, Platform)];

/// What a rule's capture groups mean.
#[derive(Debug, Clone, Copy)]
pub enum Capture {
    /// Group `id`; the platform is fixed by the rule.
    Id(Platform),
    /// Groups `id` and `platform`; the token is an agent-specific code.
    IdWithCode(CodeTable),
    /// Groups `id` and `platform`; the token is a platform name or code.
    IdWithPlatformName,
    /// Group `url` holds a wrapped link, possibly percent-encoded.
    EmbeddedUrl,
}

impl Capture {
    /// Bespoke rules embed the item directly and are tried before generic ones.
    pub fn is_bespoke(&self) -> bool {
        matches!(self, Capture::Id(_) | Capture::IdWithCode(_))
    }
}

/// One compiled pattern and the meaning of its captures.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub pattern: Regex,
    pub capture: Capture,
}

impl PatternRule {
    fn new(pattern: &str, capture: Capture) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid built-in pattern {:?}: {}", pattern, e));
        Self { pattern, capture }
    }

    pub fn captures<'a>(&self, input: &'a str) -> Option<Captures<'a>> {
        self.pattern.captures(input)
    }
}

/// Ordered rule tables for every marketplace and agent.
#[derive(Debug)]
pub struct PatternRegistry {
    marketplaces: Vec<(Platform, Vec<PatternRule>)>,
    agents: Vec<(Agent, Vec<PatternRule>)>,
    catch_all: PatternRule,
}

static REGISTRY: LazyLock<PatternRegistry> = LazyLock::new(PatternRegistry::build);

// ============================================================================
// Agent code tables
// ============================================================================

const CSSBUY_CODES: CodeTable = &[
    ("micro", Platform::Weidian),
    ("1688", Platform::OneSixEightEight),
    ("xianyu", Platform::Xianyu),
    ("jd", Platform::Jd),
];

const HOOBUY_CODES: CodeTable = &[
    ("0", Platform::OneSixEightEight),
    ("1", Platform::Taobao),
    ("2", Platform::Weidian),
];

const PATH_NAME_CODES: CodeTable = &[
    ("taobao", Platform::Taobao),
    ("tmall", Platform::Taobao),
    ("weidian", Platform::Weidian),
    ("1688", Platform::OneSixEightEight),
    ("ali_1688", Platform::OneSixEightEight),
    ("jd", Platform::Jd),
    ("xianyu", Platform::Xianyu),
];

const ACBUY_CODES: CodeTable = &[
    ("TB", Platform::Taobao),
    ("WD", Platform::Weidian),
    ("AL", Platform::OneSixEightEight),
    ("JD", Platform::Jd),
    ("XY", Platform::Xianyu),
];

const SIFUBUY_CODES: CodeTable = &[
    ("1", Platform::Taobao),
    ("2", Platform::OneSixEightEight),
    ("3", Platform::Weidian),
];

const USFANS_CODES: CodeTable = &[
    ("1", Platform::OneSixEightEight),
    ("2", Platform::Taobao),
    ("3", Platform::Weidian),
];

/// Look a token up in an agent code table.
pub fn lookup_code(table: CodeTable, token: &str) -> Option<Platform> {
    table
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(token))
        .map(|(_, platform)| *platform)
}

// ============================================================================
// Rule builders
// ============================================================================

const ID: &str = r"(?P<id>[A-Za-z0-9_-]+)";
const WRAPPED: &str = r"(?P<url>[^&#]+)";

fn marketplace(platform: Platform, patterns: &[&str]) -> (Platform, Vec<PatternRule>) {
    let rules = patterns
        .iter()
        .map(|p| PatternRule::new(p, Capture::Id(platform)))
        .collect();
    (platform, rules)
}

/// `?<param>=<wrapped link>` on the agent's host.
fn wrapped(host: &str, param: &str) -> PatternRule {
    PatternRule::new(
        &format!(r"(?i){}/.*?[?&]{}={}", regex::escape(host), param, WRAPPED),
        Capture::EmbeddedUrl,
    )
}

/// `id=<id>` and `<param>=<token>` in either order on `<host><path>`.
fn query_pair(host: &str, path: &str, param: &str, capture: Capture) -> [PatternRule; 2] {
    let prefix = format!(r"(?i){}{}", regex::escape(host), path);
    [
        PatternRule::new(
            &format!(r"{}.*?[?&]id={}.*?&{}=(?P<platform>[A-Za-z0-9_]+)", prefix, ID, param),
            capture,
        ),
        PatternRule::new(
            &format!(r"{}.*?[?&]{}=(?P<platform>[A-Za-z0-9_]+).*?&id={}", prefix, param, ID),
            capture,
        ),
    ]
}

impl PatternRegistry {
    /// Shared registry instance.
    pub fn global() -> &'static PatternRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let marketplaces = vec![
            marketplace(
                Platform::Taobao,
                &[
                    r"(?i)(?:item|detail)\.(?:taobao|tmall)\.com/.*?[?&]id=(?P<id>\d+)",
                    r"(?i)(?:^|//)(?:h5\.m\.|m\.intl\.|main\.m\.|m\.)taobao\.com/.*?[?&]id=(?P<id>\d+)",
                    r"(?i)world\.taobao\.com/item/(?P<id>\d+)",
                    r"(?i)a\.m\.taobao\.com/i(?P<id>\d+)\.htm",
                ],
            ),
            marketplace(
                Platform::Weidian,
                &[
                    r"(?i)weidian\.com/.*?[?&]itemid=(?P<id>\d+)",
                    r"(?i)weidian\.com/item/(?P<id>\d+)",
                ],
            ),
            marketplace(
                Platform::OneSixEightEight,
                &[
                    r"(?i)1688\.com/offer/(?P<id>\d+)\.html",
                    r"(?i)1688\.com/.*?[?&]offerid=(?P<id>\d+)",
                ],
            ),
            marketplace(
                Platform::Jd,
                &[
                    r"(?i)item\.(?:m\.)?jd\.com/(?:product/)?(?P<id>\d+)\.html",
                    r"(?i)jd\.com/.*?[?&](?:sku|skuid|wareid)=(?P<id>\d+)",
                ],
            ),
            marketplace(
                Platform::Xianyu,
                &[
                    r"(?i)goofish\.com/item.*?[?&]id=(?P<id>\d+)",
                    r"(?i)2\.taobao\.com/item\.htm.*?[?&]id=(?P<id>\d+)",
                    r"(?i)market\.m\.taobao\.com/app/idleFish.*?[?&]id=(?P<id>\d+)",
                ],
            ),
        ];

        let name = Capture::IdWithPlatformName;
        let mut agents: Vec<(Agent, Vec<PatternRule>)> = Vec::with_capacity(Agent::ALL.len());

        agents.push((
            Agent::Pandabuy,
            vec![
                wrapped("pandabuy.com", "url"),
                PatternRule::new(
                    &format!(r"(?i)pandabuy\.com/uniorder.*?[?&]text={}", WRAPPED),
                    Capture::EmbeddedUrl,
                ),
            ],
        ));
        agents.push((Agent::Wegobuy, vec![wrapped("wegobuy.com", "url")]));
        agents.push((Agent::Superbuy, vec![wrapped("superbuy.com", "url")]));
        agents.push((
            Agent::Sugargoo,
            vec![
                wrapped("sugargoo.com", "productlink"),
                wrapped("sugargoo.com", "url"),
            ],
        ));
        agents.push((
            Agent::Cssbuy,
            vec![
                PatternRule::new(
                    r"(?i)cssbuy\.com/item-(?P<platform>micro|1688|xianyu|jd)-(?P<id>\d+)\.html",
                    Capture::IdWithCode(CSSBUY_CODES),
                ),
                PatternRule::new(
                    r"(?i)cssbuy\.com/item-(?P<id>\d+)\.html",
                    Capture::Id(Platform::Taobao),
                ),
                wrapped("cssbuy.com", "url"),
            ],
        ));
        agents.push((Agent::Hagobuy, vec![wrapped("hagobuy.com", "url")]));
        agents.push((Agent::Kakobuy, vec![wrapped("kakobuy.com", "url")]));

        for (agent, host) in [
            (Agent::Cnfans, "cnfans.com"),
            (Agent::Mulebuy, "mulebuy.com"),
            (Agent::Joyabuy, "joyabuy.com"),
            (Agent::Orientdig, "orientdig.com"),
        ] {
            let mut rules = Vec::new();
            rules.extend(query_pair(host, "/product", "platform", name));
            rules.extend(query_pair(host, "/product", "shop_type", name));
            rules.push(wrapped(host, "url"));
            agents.push((agent, rules));
        }

        agents.push((Agent::Allchinabuy, vec![wrapped("allchinabuy.com", "url")]));
        agents.push((
            Agent::Hoobuy,
            vec![
                PatternRule::new(
                    &format!(r"(?i)hoobuy\.com/product/(?P<platform>\d+)/{}", ID),
                    Capture::IdWithCode(HOOBUY_CODES),
                ),
                wrapped("hoobuy.com", "url"),
            ],
        ));
        agents.push((
            Agent::Basetao,
            vec![
                PatternRule::new(
                    r"(?i)basetao\.com/.*?/agent/(?P<platform>[a-z0-9_]+)/(?P<id>\d+)\.html",
                    Capture::IdWithCode(PATH_NAME_CODES),
                ),
                wrapped("basetao.com", "url"),
            ],
        ));
        agents.push((
            Agent::Oopbuy,
            vec![
                PatternRule::new(
                    &format!(r"(?i)oopbuy\.com/product/(?P<platform>[a-z0-9_]+)/{}", ID),
                    Capture::IdWithCode(PATH_NAME_CODES),
                ),
                wrapped("oopbuy.com", "url"),
            ],
        ));
        agents.push((Agent::Lovegobuy, {
            let mut rules = query_pair("lovegobuy.com", "/product", "shop_type", name).to_vec();
            rules.push(wrapped("lovegobuy.com", "url"));
            rules
        }));
        agents.push((Agent::Acbuy, {
            let mut rules =
                query_pair("acbuy.com", "/product", "source", Capture::IdWithCode(ACBUY_CODES))
                    .to_vec();
            rules.push(wrapped("acbuy.com", "url"));
            rules
        }));
        agents.push((Agent::Itaobuy, vec![wrapped("itaobuy.com", "url")]));
        agents.push((Agent::Hubbuycn, vec![wrapped("hubbuycn.com", "url")]));
        agents.push((Agent::Litbuy, {
            let mut rules = query_pair("litbuy.com", "/products/details", "channel", name).to_vec();
            rules.push(wrapped("litbuy.com", "url"));
            rules
        }));
        agents.push((Agent::Loongbuy, vec![wrapped("loongbuy.com", "url")]));
        agents.push((
            Agent::Sifubuy,
            query_pair("sifubuy.com", "/detail", "type", Capture::IdWithCode(SIFUBUY_CODES)).to_vec(),
        ));
        agents.push((Agent::Eastmallbuy, {
            let mut rules = query_pair("eastmallbuy.com", "/index/item", "tp", name).to_vec();
            rules.push(wrapped("eastmallbuy.com", "url"));
            rules
        }));
        agents.push((Agent::Ezbuycn, vec![wrapped("ezbuycn.com", "url")]));
        agents.push((Agent::Blikbuy, vec![wrapped("blikbuy.com", "url")]));
        agents.push((
            Agent::Usfans,
            vec![
                PatternRule::new(
                    &format!(r"(?i)usfans\.com/product/(?P<platform>\d+)/{}", ID),
                    Capture::IdWithCode(USFANS_CODES),
                ),
                wrapped("usfans.com", "url"),
            ],
        ));
        agents.push((Agent::Fishgoo, vec![wrapped("fishgoo.com", "url")]));

        Self {
            marketplaces,
            agents,
            catch_all: PatternRule::new(
                &format!(r"(?i)[?&]url={}", WRAPPED),
                Capture::EmbeddedUrl,
            ),
        }
    }

    /// Marketplace rules in extraction order.
    pub fn marketplaces(&self) -> &[(Platform, Vec<PatternRule>)] {
        &self.marketplaces
    }

    /// Agent rules in registry order.
    pub fn agents(&self) -> &[(Agent, Vec<PatternRule>)] {
        &self.agents
    }

    pub fn agent_rules(&self, agent: Agent) -> &[PatternRule] {
        self.agents
            .iter()
            .find(|(a, _)| *a == agent)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    /// Marketplaces the registry can extract from.
    pub fn supported_platforms(&self) -> Vec<Platform> {
        self.marketplaces.iter().map(|(p, _)| *p).collect()
    }

    /// Agents the registry can unwrap, in registry order.
    pub fn supported_agents(&self) -> Vec<Agent> {
        self.agents.iter().map(|(a, _)| *a).collect()
    }

    /// Fallback for any link carrying a `url=` parameter.
    pub fn catch_all(&self) -> &PatternRule {
        &self.catch_all
    }
}
