use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

use matinee_db::models::GroupRow;
use matinee_types::api::{
    AddMemberRequest, Claims, CreateGroupRequest, GroupResponse, JoinGroupRequest, MemberSummary,
    UpdateGroupRequest,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::{parse_db_time, parse_db_uuid};

/// Invite tokens are 16 random bytes, hex-encoded.
fn generate_invite_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("group name is required"));
    }

    let group_id = Uuid::new_v4();
    let invite_token = generate_invite_token();

    state.db.create_group(
        &group_id.to_string(),
        &req.name,
        &req.description,
        &claims.sub.to_string(),
        &invite_token,
    )?;

    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;

    Ok((StatusCode::CREATED, Json(group_response(&state, group)?)))
}

#[derive(Debug, Deserialize)]
pub struct ListGroupsQuery {
    pub created_by: Option<Uuid>,
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListGroupsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let created_by = query.created_by.map(|id| id.to_string());
    let groups = state
        .db
        .list_groups_for_user(&claims.sub.to_string(), created_by.as_deref())?;

    let responses = groups
        .into_iter()
        .map(|group| group_response(&state, group))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(responses))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;

    Ok(Json(group_response(&state, group)?))
}

pub async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;
    if group.created_by != claims.sub.to_string() {
        return Err(ApiError::Forbidden("only the creator can update this group"));
    }

    state
        .db
        .update_group(&group_id.to_string(), req.name.as_deref(), req.description.as_deref())?;

    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;

    Ok(Json(group_response(&state, group)?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;
    if group.created_by != claims.sub.to_string() {
        return Err(ApiError::Forbidden("only the creator can delete this group"));
    }

    state.db.delete_group_cascade(&group_id.to_string())?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "group deleted successfully",
    })))
}

pub async fn join_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JoinGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state
        .db
        .get_group_by_invite_token(&req.invite_token)?
        .ok_or(ApiError::NotFound("group"))?;

    state.db.add_member(&group.id, &claims.sub.to_string())?;

    Ok(Json(group_response(&state, group)?))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;
    if !state.db.is_member(&group.id, &claims.sub.to_string())? {
        return Err(ApiError::Forbidden("only members can add members"));
    }
    if state.db.get_user_by_id(&req.user_id.to_string())?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    state.db.add_member(&group.id, &req.user_id.to_string())?;

    Ok(Json(group_response(&state, group)?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state
        .db
        .get_group(&group_id.to_string())?
        .ok_or(ApiError::NotFound("group"))?;

    // Members may leave; the creator may remove anyone.
    let is_self = user_id == claims.sub;
    if !is_self && group.created_by != claims.sub.to_string() {
        return Err(ApiError::Forbidden("only the creator can remove other members"));
    }

    state.db.remove_member(&group.id, &user_id.to_string())?;

    Ok(Json(group_response(&state, group)?))
}

fn group_response(state: &AppState, group: GroupRow) -> Result<GroupResponse, ApiError> {
    let members = state
        .db
        .get_members(&group.id)?
        .into_iter()
        .map(|m| MemberSummary {
            user_id: parse_db_uuid(&m.user_id, "group member"),
            name: m.name,
            profile_pic: m.profile_pic,
        })
        .collect();

    Ok(GroupResponse {
        id: parse_db_uuid(&group.id, "group"),
        name: group.name,
        description: group.description,
        created_by: parse_db_uuid(&group.created_by, "group creator"),
        invite_token: group.invite_token,
        members,
        created_at: parse_db_time(&group.created_at, "group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_tokens_are_32_hex_chars() {
        let token = generate_invite_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_invite_token());
    }
}
