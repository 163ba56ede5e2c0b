use crossgfx_core::gpu::{
    BlendFactor,
    PrimitiveTopology,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum D3D12TopologyType {
    Point,
    Line,
    Triangle,
}

pub fn topology_type(topology: PrimitiveTopology) -> D3D12TopologyType {
    match topology {
        PrimitiveTopology::PointList => D3D12TopologyType::Point,
        PrimitiveTopology::LineList | PrimitiveTopology::LineStrip => D3D12TopologyType::Line,
        PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip => D3D12TopologyType::Triangle,
    }
}

/// Alpha blend factors can't reference color channels.
pub fn alpha_blend_factor(factor: BlendFactor) -> BlendFactor {
    match factor {
        BlendFactor::SrcColor => BlendFactor::SrcAlpha,
        BlendFactor::DstColor => BlendFactor::DstAlpha,
        BlendFactor::OneMinusSrcColor => BlendFactor::OneMinusSrcAlpha,
        BlendFactor::OneMinusDstColor => BlendFactor::OneMinusDstAlpha,
        BlendFactor::ConstantColor => BlendFactor::ConstantAlpha,
        BlendFactor::OneMinusConstantColor => BlendFactor::OneMinusConstantAlpha,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_classes() {
        assert_eq!(topology_type(PrimitiveTopology::PointList), D3D12TopologyType::Point);
        assert_eq!(topology_type(PrimitiveTopology::LineStrip), D3D12TopologyType::Line);
        assert_eq!(topology_type(PrimitiveTopology::TriangleStrip), D3D12TopologyType::Triangle);
    }

    #[test]
    fn alpha_factors() {
        assert_eq!(alpha_blend_factor(BlendFactor::SrcColor), BlendFactor::SrcAlpha);
        assert_eq!(alpha_blend_factor(BlendFactor::OneMinusDstColor), BlendFactor::OneMinusDstAlpha);
        assert_eq!(alpha_blend_factor(BlendFactor::One), BlendFactor::One);
        assert_eq!(alpha_blend_factor(BlendFactor::SrcAlphaSaturate), BlendFactor::SrcAlphaSaturate);
    }
}
