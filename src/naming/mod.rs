//! Resource naming for provisioned applications
//!
//! Every application gets three cluster objects whose names are derived once,
//! from the caller's cluster name and the application's generated id:
//!
//! ```text
//! workload  = <cluster>-<first 8 hex of id>
//! endpoint  = <workload>-svc
//! ingress   = <workload>-ingress
//! host      = <cluster, lowercased, [^a-z0-9-] -> '-', trimmed of '-'>.<base domain>
//! ```
//!
//! Names must be valid DNS labels (RFC 1035: lowercase alphanumerics and '-',
//! starting with a letter, at most 63 characters). The cluster-name part is
//! sanitized and truncated so that the longest derived name still fits.
//! The host is a DNS-1123 subdomain: its first label is capped at 63
//! characters and the whole name at 253.
//!
//! Names are not checked against the cluster before use. Two ids sharing an
//! 8-character prefix under the same cluster name would collide; the create
//! call then fails with a conflict.

use uuid::Uuid;

use crate::Error;

/// Maximum length of a Kubernetes DNS label
pub const MAX_NAME_LEN: usize = 63;

/// Number of id characters appended to the cluster name
pub const ID_PREFIX_LEN: usize = 8;

/// Suffix of the endpoint (Service) name
pub const ENDPOINT_SUFFIX: &str = "-svc";

/// Suffix of the ingress route name
pub const INGRESS_SUFFIX: &str = "-ingress";

/// Maximum length of a DNS-1123 subdomain
pub const MAX_HOST_LEN: usize = 253;

/// Prefix used when a sanitized cluster name would start with a digit
const LEADING_DIGIT_PREFIX: &str = "app-";

/// Names of the cluster objects that make up one application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNames {
    /// Deployment name
    pub workload: String,
    /// Service name
    pub endpoint: String,
    /// Ingress name
    pub ingress: String,
    /// Routable hostname bound on the ingress
    pub host: String,
}

impl ResourceNames {
    /// Derive all names for an application
    ///
    /// Fails with a validation error when the cluster name has no usable
    /// characters, the base domain is empty, or the host would be too long.
    pub fn derive(cluster_name: &str, id: &Uuid, base_domain: &str) -> Result<Self, Error> {
        let stem = workload_stem(cluster_name)?;
        let host = hostname(cluster_name, base_domain)?;
        let id_hex = id.simple().to_string();
        let workload = format!("{}-{}", stem, &id_hex[..ID_PREFIX_LEN]);

        Ok(Self {
            endpoint: format!("{workload}{ENDPOINT_SUFFIX}"),
            ingress: format!("{workload}{INGRESS_SUFFIX}"),
            host,
            workload,
        })
    }
}

/// Lowercase and replace every character outside `[a-z0-9-]` with `-`
pub fn sanitize_label(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Hostname for a cluster name under `base_domain`
///
/// The first label is the trimmed, sanitized cluster name capped at 63
/// characters; well-formed names like `demo` pass through unchanged.
pub fn hostname(cluster_name: &str, base_domain: &str) -> Result<String, Error> {
    let base_domain = base_domain.trim().trim_matches('.');
    if base_domain.is_empty() {
        return Err(Error::validation("base domain must not be empty"));
    }

    let mut label = trimmed_label(cluster_name)?;
    label.truncate(MAX_NAME_LEN);
    let host = format!("{}.{}", label.trim_end_matches('-'), base_domain);
    if host.len() > MAX_HOST_LEN {
        return Err(Error::validation(format!(
            "hostname '{host}' is longer than {MAX_HOST_LEN} characters"
        )));
    }
    Ok(host)
}

/// Sanitized cluster name without leading or trailing '-'
fn trimmed_label(cluster_name: &str) -> Result<String, Error> {
    let sanitized = sanitize_label(cluster_name);
    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        return Err(Error::validation(format!(
            "clusterName '{cluster_name}' must contain at least one letter or digit"
        )));
    }
    Ok(trimmed.to_string())
}

/// Cluster-name part of the workload name, sized so `<stem>-<id>-ingress` fits
fn workload_stem(cluster_name: &str) -> Result<String, Error> {
    let budget = MAX_NAME_LEN - 1 - ID_PREFIX_LEN - INGRESS_SUFFIX.len();

    let trimmed = trimmed_label(cluster_name)?;
    let mut stem = if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{LEADING_DIGIT_PREFIX}{trimmed}")
    } else {
        trimmed
    };

    // ASCII only at this point, so byte truncation is safe
    stem.truncate(budget);
    Ok(stem.trim_end_matches('-').to_string())
}
