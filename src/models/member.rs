//! Member models: registration and the public curator summary.

use serde::{Deserialize, Serialize};

/// Public summary of a curator, embedded in curation responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CuratorResponse {
    pub member_id: i64,
    pub email: String,
    pub nickname: String,
    pub introduction: Option<String>,
    pub image: Option<String>,
    /// Number of members subscribed to this curator
    pub my_subscriber: i64,
    /// Number of curations this curator authored
    pub curations: i64,
}

/// Request body for registering a new member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub email: String,
    pub nickname: String,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Member profile as seen by a viewer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    #[serde(flatten)]
    pub curator: CuratorResponse,
    /// Whether the viewer subscribes to this member; `null` for anonymous viewers
    pub subscribed: Option<bool>,
}

/// Request body for editing a profile. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_flattens_curator_and_keeps_null_flag() {
        let profile = MemberProfile {
            curator: CuratorResponse {
                member_id: 3,
                email: "bora@whosbook.dev".to_string(),
                nickname: "bora".to_string(),
                introduction: None,
                image: None,
                my_subscriber: 2,
                curations: 1,
            },
            subscribed: None,
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["memberId"], 3);
        assert_eq!(json["mySubscriber"], 2);
        assert!(json["subscribed"].is_null());
        assert!(json.get("curator").is_none());
    }
}
