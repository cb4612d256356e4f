//! Domain-policy publishing.
//!
//! Translates a plan's domain preference plus the static endpoint mapping
//! into an outgoing network-marking intent. Only the intent is computed
//! here; pushing it onto real network equipment is an external concern.

use tracing::debug;

use qkd_common::types::{Domain, DomainPolicy, SloClass};

use crate::config::DomainMapping;

/// Computed network-marking intent for the preferred transport domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyIntent {
    pub preferred: Domain,
    pub dscp: Option<u32>,
    pub srv6_bsid: Option<String>,
    pub prefer_6ghz: bool,
}

/// Determine the marking intent for one plan.
///
/// The plan's DSCP and binding SID win when set (zero / empty mean unset on
/// the wire); otherwise the mapping supplies the value for the active SLO
/// class. The 6 GHz multi-link preference is the OR of both flags.
pub fn publish_domain_policy(
    policy: &DomainPolicy,
    mapping: &DomainMapping,
    slo_class: SloClass,
) -> PolicyIntent {
    match policy.preferred {
        Domain::Fso => debug!("domain preference: FSO"),
        Domain::Mmwave => debug!("domain preference: mmWave"),
        Domain::Leo => debug!("domain preference: LEO"),
        Domain::Wifi7 => debug!("domain preference: Wi-Fi 7"),
        Domain::Fr3_6g => debug!("domain preference: FR3/6G"),
    }

    let mapped_dscp = match slo_class {
        SloClass::Urllc => mapping.urlcc_dscp,
        SloClass::Embb => mapping.embb_dscp,
    };
    let mapped_bsid = match slo_class {
        SloClass::Urllc => mapping.srv6_bsid_urlcc.clone(),
        SloClass::Embb => mapping.srv6_bsid_embb.clone(),
    };

    let dscp = if policy.dscp != 0 {
        Some(policy.dscp)
    } else {
        mapped_dscp
    };
    let srv6_bsid = if !policy.srv6_bsid.is_empty() {
        Some(policy.srv6_bsid.clone())
    } else {
        mapped_bsid
    };
    let prefer_6ghz = mapping.mlo_prefer_6ghz || policy.mlo_prefer_6ghz;

    if let Some(dscp) = dscp {
        debug!("set DSCP {dscp}");
    }
    if let Some(ref bsid) = srv6_bsid {
        debug!("target SRv6 BSID {bsid}");
    }
    if prefer_6ghz {
        debug!("prefer Wi-Fi 7 6 GHz MLO leg");
    }

    PolicyIntent {
        preferred: policy.preferred,
        dscp,
        srv6_bsid,
        prefer_6ghz,
    }
}
