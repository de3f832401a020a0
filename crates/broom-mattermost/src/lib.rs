//! Mattermost REST (API v4) implementation of the broom [`broom_core::ChatPlatform`].

mod mattermost_api_client;

pub use mattermost_api_client::{
    MattermostApiClient, MattermostClientConfig, PERMISSION_DELETE_OTHERS_POSTS,
    PERMISSION_DELETE_POST,
};
