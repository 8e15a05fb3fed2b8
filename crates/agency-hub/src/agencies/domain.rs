use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Internally generated agency identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgencyId(pub i64);

impl fmt::Display for AgencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields sourced from the agency directory. Reconciliation overwrites exactly
/// this set on existing records and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgencyProfile {
    pub name: Option<String>,
    pub office_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub logo: Option<String>,
    pub site: Option<String>,
    pub site_name: Option<String>,
    pub acquaint_site_prefix: Option<String>,
    pub daft_api_key: Option<String>,
    pub fourpm_branch_id: Option<i64>,
    pub myhome_api_key: Option<String>,
    pub myhome_group_id: Option<i64>,
    pub unique_key: Option<String>,
}

/// Fields maintained by hand (CRM and billing links). Never touched by sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgencyBookkeeping {
    pub ghl_id: Option<String>,
    pub whmcs_id: Option<String>,
    pub primary_source: Option<String>,
}

/// Persisted agency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: AgencyId,
    #[serde(flatten)]
    pub profile: AgencyProfile,
    #[serde(flatten)]
    pub bookkeeping: AgencyBookkeeping,
    #[serde(default)]
    pub total_properties: i64,
}

impl Agency {
    /// Vendor key used to scope listing fetches, if the agency carries one.
    pub fn vendor_key(&self) -> Option<&str> {
        self.profile
            .unique_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }

    pub fn summary(&self) -> AgencySummary {
        AgencySummary::from_profile(&self.profile)
    }
}

/// Agency payload before an id has been assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgency {
    #[serde(flatten)]
    pub profile: AgencyProfile,
    #[serde(flatten)]
    pub bookkeeping: AgencyBookkeeping,
    #[serde(default)]
    pub total_properties: i64,
}

impl NewAgency {
    /// A freshly synced agency: bookkeeping left empty and no counted listings.
    pub fn from_profile(profile: AgencyProfile) -> Self {
        Self {
            profile,
            bookkeeping: AgencyBookkeeping::default(),
            total_properties: 0,
        }
    }

    pub fn into_agency(self, id: AgencyId) -> Agency {
        Agency {
            id,
            profile: self.profile,
            bookkeeping: self.bookkeeping,
            total_properties: self.total_properties,
        }
    }
}

/// Partial update. An absent field is left alone; an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgencyUpdate {
    #[serde(deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub office_name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub address1: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub address2: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub logo: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub site: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub site_name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub acquaint_site_prefix: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub daft_api_key: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub fourpm_branch_id: Option<Option<i64>>,
    #[serde(deserialize_with = "present")]
    pub myhome_api_key: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub myhome_group_id: Option<Option<i64>>,
    #[serde(deserialize_with = "present")]
    pub unique_key: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub ghl_id: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub whmcs_id: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub primary_source: Option<Option<String>>,
    pub total_properties: Option<i64>,
}

impl AgencyUpdate {
    pub fn apply_to(self, agency: &mut Agency) {
        fn set<T>(slot: &mut Option<T>, value: Option<Option<T>>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        let profile = &mut agency.profile;
        set(&mut profile.name, self.name);
        set(&mut profile.office_name, self.office_name);
        set(&mut profile.address1, self.address1);
        set(&mut profile.address2, self.address2);
        set(&mut profile.logo, self.logo);
        set(&mut profile.site, self.site);
        set(&mut profile.site_name, self.site_name);
        set(&mut profile.acquaint_site_prefix, self.acquaint_site_prefix);
        set(&mut profile.daft_api_key, self.daft_api_key);
        set(&mut profile.fourpm_branch_id, self.fourpm_branch_id);
        set(&mut profile.myhome_api_key, self.myhome_api_key);
        set(&mut profile.myhome_group_id, self.myhome_group_id);
        set(&mut profile.unique_key, self.unique_key);

        let bookkeeping = &mut agency.bookkeeping;
        set(&mut bookkeeping.ghl_id, self.ghl_id);
        set(&mut bookkeeping.whmcs_id, self.whmcs_id);
        set(&mut bookkeeping.primary_source, self.primary_source);

        if let Some(total) = self.total_properties {
            agency.total_properties = total;
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Identifying triple echoed back in sync and recount summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencySummary {
    pub name: Option<String>,
    pub office_name: Option<String>,
    pub unique_key: Option<String>,
}

impl AgencySummary {
    pub fn from_profile(profile: &AgencyProfile) -> Self {
        Self {
            name: profile.name.clone(),
            office_name: profile.office_name.clone(),
            unique_key: profile.unique_key.clone(),
        }
    }
}

/// Agency as published by the 4pm agency directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExternalAgencyRecord {
    pub name: Option<String>,
    pub office_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub logo: Option<String>,
    pub site: Option<String>,
    pub daft_api_key: Option<String>,
    pub key: Option<String>,
    // The directory spells this one "Acquiant".
    #[serde(rename = "AcquiantCustomer", default)]
    pub acquaint_customer: Option<AcquaintCustomer>,
    #[serde(rename = "MyhomeApi", default)]
    pub myhome_api: Option<MyhomeApi>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AcquaintCustomer {
    #[serde(rename = "SiteName", default)]
    pub site_name: Option<String>,
    #[serde(rename = "SitePrefix", default)]
    pub site_prefix: Option<String>,
    #[serde(rename = "FourPMBranchID", default, deserialize_with = "lenient_i64")]
    pub fourpm_branch_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MyhomeApi {
    #[serde(rename = "ApiKey", default)]
    pub api_key: Option<String>,
    #[serde(rename = "GroupID", default, deserialize_with = "lenient_i64")]
    pub group_id: Option<i64>,
}

impl ExternalAgencyRecord {
    /// Office name as used for matching; a missing name is the empty string.
    pub fn office_name_or_empty(&self) -> &str {
        self.office_name.as_deref().unwrap_or("")
    }

    pub fn to_profile(&self) -> AgencyProfile {
        let acquaint = self.acquaint_customer.clone().unwrap_or_default();
        let myhome = self.myhome_api.clone().unwrap_or_default();

        AgencyProfile {
            name: self.name.clone(),
            office_name: Some(self.office_name_or_empty().to_string()),
            address1: self.address1.clone(),
            address2: self.address2.clone(),
            logo: self.logo.clone(),
            site: self.site.clone(),
            site_name: acquaint.site_name,
            acquaint_site_prefix: acquaint.site_prefix,
            daft_api_key: self.daft_api_key.clone(),
            fourpm_branch_id: acquaint.fourpm_branch_id,
            myhome_api_key: myhome.api_key,
            myhome_group_id: myhome.group_id,
            unique_key: self.key.clone(),
        }
    }
}

/// Accepts `12`, `"12"`, `""` and `null`; the directory is inconsistent about ids.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(value)) => Ok(Some(value)),
        Some(Raw::Float(value))
            if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 =>
        {
            Ok(Some(value as i64))
        }
        Some(Raw::Float(value)) => Err(serde::de::Error::custom(format!(
            "expected a whole number, got {value}"
        ))),
        Some(Raw::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
