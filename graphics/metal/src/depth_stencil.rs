use crossgfx_core::gpu::{
    CompareFunc,
    GraphicsPipelineState,
    StencilParams,
};

/// The part of a pipeline state that goes into a Metal depth stencil state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MTLDepthStencilKey {
    pub depth_func: CompareFunc,
    pub depth_write_enable: bool,
    pub stencil: Option<StencilParams>,
}

impl MTLDepthStencilKey {
    pub fn from_state(state: &GraphicsPipelineState) -> Self {
        Self {
            depth_func: if state.depth_test_enable {
                state.depth_func
            } else {
                CompareFunc::Always
            },
            depth_write_enable: state.depth_write_enable,
            stencil: state.stencil_enable.then_some(StencilParams {
                // The reference value is set on the encoder.
                reference: 0,
                ..state.stencil_params
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crossgfx_core::gpu::StateCache;

    use super::*;

    #[test]
    fn disabled_depth_test_always_passes() {
        let mut state = GraphicsPipelineState::default();
        state.depth_func = CompareFunc::Greater;
        assert_eq!(MTLDepthStencilKey::from_state(&state).depth_func, CompareFunc::Always);
        state.depth_test_enable = true;
        assert_eq!(MTLDepthStencilKey::from_state(&state).depth_func, CompareFunc::Greater);
    }

    #[test]
    fn stencil_reference_does_not_split_the_cache() {
        let cache = StateCache::<MTLDepthStencilKey, u32>::new();
        let mut state = GraphicsPipelineState::default();
        state.stencil_enable = true;
        state.stencil_params.reference = 1;
        let a = cache.get_or_try_create::<(), _>(&MTLDepthStencilKey::from_state(&state), |_| Ok(1)).unwrap();
        state.stencil_params.reference = 7;
        let b = cache.get_or_try_create::<(), _>(&MTLDepthStencilKey::from_state(&state), |_| Ok(2)).unwrap();
        assert_eq!((*a, *b), (1, 1));
        state.stencil_enable = false;
        cache.get_or_try_create::<(), _>(&MTLDepthStencilKey::from_state(&state), |_| Ok(3)).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
