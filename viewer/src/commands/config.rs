use governor::ViewerConfig;

use crate::state::AppState;

pub fn get_config(state: &AppState) -> ViewerConfig {
    state.config.clone()
}
