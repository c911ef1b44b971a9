//! Domain classification.
//!
//! Answers whether a destination host belongs to the blocklist (GFWList plus
//! manually added domains) or to the company domain list. The blocklist set is
//! rebuilt off-lock on every reload and swapped in as a whole, so concurrent
//! sessions only ever see a complete set.

mod gfwlist;
mod source;

pub use gfwlist::{decode_list, extract_domain, parse_list};
pub use source::BlocklistSource;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};

/// Manually configured domain lists.
#[derive(Debug, Clone, Default)]
struct DomainLists {
    company: Vec<String>,
    extra_blocklist: Vec<String>,
}

/// Classifies destination hosts for routing.
#[derive(Debug, Default)]
pub struct DomainClassifier {
    blocklist: RwLock<Arc<HashSet<String>>>,
    lists: RwLock<DomainLists>,
    /// Ticket of the most recently requested load.
    latest_load: Mutex<u64>,
}

impl DomainClassifier {
    /// Create a classifier with an empty blocklist and no domain lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the company and extra blocklist domains.
    pub fn set_domain_lists<C, E>(&self, company: C, extra_blocklist: E)
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let lists = DomainLists {
            company: normalize_domains(company),
            extra_blocklist: normalize_domains(extra_blocklist),
        };
        *self.lists.write() = lists;
    }

    /// Load a blocklist from `source`, replacing the current set.
    ///
    /// Returns the number of domains in the new set. On error the previous
    /// set stays in place. The load is ordered when this is called, not
    /// when the future is first polled: if a later load is requested before
    /// this one finishes, this one is discarded with an error.
    pub fn load_blocklist(
        &self,
        source: &BlocklistSource,
    ) -> impl Future<Output = Result<usize>> + Send + '_ {
        let ticket = {
            let mut latest = self.latest_load.lock();
            *latest += 1;
            *latest
        };
        let source = source.clone();

        async move {
            let raw = source.fetch().await?;
            let domains = parse_list(&decode_list(&raw));

            let latest = self.latest_load.lock();
            if *latest != ticket {
                return Err(Error::blocklist(format!(
                    "load from {} superseded by a newer load",
                    source
                )));
            }
            Ok(self.replace_blocklist(domains))
        }
    }

    /// Swap in a new blocklist set. Returns its size.
    pub fn replace_blocklist(&self, domains: HashSet<String>) -> usize {
        let count = domains.len();
        *self.blocklist.write() = Arc::new(domains);
        count
    }

    /// Number of domains in the current blocklist set.
    pub fn blocklist_len(&self) -> usize {
        self.blocklist.read().len()
    }

    /// Check if `host` is covered by the blocklist.
    ///
    /// A listed domain covers all of its subdomains.
    pub fn is_blocklisted(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let set = Arc::clone(&self.blocklist.read());

        if set.contains(&host) {
            return true;
        }

        if self
            .lists
            .read()
            .extra_blocklist
            .iter()
            .any(|domain| matches_domain(&host, domain))
        {
            return true;
        }

        // Parent domains, keeping at least two labels.
        let mut rest = host.as_str();
        while let Some(idx) = rest.find('.') {
            rest = &rest[idx + 1..];
            if !rest.contains('.') {
                break;
            }
            if set.contains(rest) {
                return true;
            }
        }

        false
    }

    /// Check if `host` is a company domain or one of its subdomains.
    pub fn is_company_domain(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.lists
            .read()
            .company
            .iter()
            .any(|domain| matches_domain(&host, domain))
    }
}

/// `host` equals `domain` or is a subdomain of it on a label boundary.
fn matches_domain(host: &str, domain: &str) -> bool {
    match host.strip_suffix(domain) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}

fn normalize_domains<I>(domains: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    domains
        .into_iter()
        .map(|d| d.as_ref().trim().trim_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}
