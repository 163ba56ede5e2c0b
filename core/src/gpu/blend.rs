use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BlendMode {
  Darken,
  Lighten,
  Multiply,
  Screen,
  Overlay,
  Src,
  SrcOver,
  SrcIn,
  Dst,
  DstIn,
  Clear,
  SrcOut,
  DstOut,
  DstOver
}

impl BlendMode {
  /// Fixed function blend params for premultiplied alpha.
  /// Modes that need the destination color in the shader fall back to the default params.
  pub fn params(&self) -> BlendParams {
    match self {
      BlendMode::Src => BlendParams::porter_duff(BlendFactor::One, BlendFactor::Zero),
      BlendMode::SrcOver => BlendParams::porter_duff(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
      BlendMode::SrcIn => BlendParams::porter_duff(BlendFactor::DstAlpha, BlendFactor::Zero),
      BlendMode::Dst => BlendParams::porter_duff(BlendFactor::Zero, BlendFactor::One),
      BlendMode::DstIn => BlendParams::porter_duff(BlendFactor::Zero, BlendFactor::SrcAlpha),
      BlendMode::Clear => BlendParams::porter_duff(BlendFactor::Zero, BlendFactor::Zero),
      BlendMode::SrcOut => BlendParams::porter_duff(BlendFactor::OneMinusDstAlpha, BlendFactor::Zero),
      BlendMode::DstOut => BlendParams::porter_duff(BlendFactor::Zero, BlendFactor::OneMinusSrcAlpha),
      BlendMode::DstOver => BlendParams::porter_duff(BlendFactor::OneMinusDstAlpha, BlendFactor::One),

      BlendMode::Darken => BlendParams {
        src_color_blend_factor: BlendFactor::One,
        dst_color_blend_factor: BlendFactor::One,
        color_blend_op: BlendOp::Min,
        ..BlendMode::SrcOver.params()
      },
      BlendMode::Lighten => BlendParams {
        src_color_blend_factor: BlendFactor::One,
        dst_color_blend_factor: BlendFactor::One,
        color_blend_op: BlendOp::Max,
        ..BlendMode::SrcOver.params()
      },
      BlendMode::Multiply => BlendParams {
        src_color_blend_factor: BlendFactor::DstColor,
        dst_color_blend_factor: BlendFactor::OneMinusSrcAlpha,
        ..BlendMode::SrcOver.params()
      },
      BlendMode::Screen => BlendParams {
        src_color_blend_factor: BlendFactor::One,
        dst_color_blend_factor: BlendFactor::OneMinusSrcColor,
        ..BlendMode::SrcOver.params()
      },
      // not expressible with fixed function blending
      BlendMode::Overlay => BlendParams::default(),
    }
  }

  pub fn name(&self) -> &'static str {
    (*self).into()
  }
}

impl GraphicsPipelineState {
  pub fn set_blend_mode(&mut self, mode: BlendMode) {
    self.blend_enable = true;
    self.blend_params = mode.params();
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn names_round_trip() {
    for mode in BlendMode::iter() {
      assert_eq!(BlendMode::from_str(mode.name()).unwrap(), mode);
    }
    assert_eq!(BlendMode::SrcOver.name(), "src_over");
    assert_eq!(BlendMode::DstOver.to_string(), "dst_over");
    assert!(BlendMode::from_str("hard_light").is_err());
  }

  #[test]
  fn porter_duff_params() {
    let src_over = BlendMode::SrcOver.params();
    assert_eq!(src_over.src_color_blend_factor, BlendFactor::One);
    assert_eq!(src_over.dst_color_blend_factor, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(src_over.src_alpha_blend_factor, BlendFactor::One);
    assert_eq!(src_over.dst_alpha_blend_factor, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(src_over.color_blend_op, BlendOp::Add);

    let dst_over = BlendMode::DstOver.params();
    assert_eq!(dst_over.src_color_blend_factor, BlendFactor::OneMinusDstAlpha);
    assert_eq!(dst_over.dst_color_blend_factor, BlendFactor::One);

    let clear = BlendMode::Clear.params();
    assert_eq!(clear.src_alpha_blend_factor, BlendFactor::Zero);
    assert_eq!(clear.dst_alpha_blend_factor, BlendFactor::Zero);
  }

  #[test]
  fn separable_modes_keep_src_over_alpha() {
    let darken = BlendMode::Darken.params();
    assert_eq!(darken.color_blend_op, BlendOp::Min);
    assert_eq!(darken.alpha_blend_op, BlendOp::Add);
    assert_eq!(darken.dst_alpha_blend_factor, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(BlendMode::Overlay.params(), BlendParams::default());
  }

  #[test]
  fn state_blend_mode() {
    let mut state = GraphicsPipelineState::default();
    state.set_blend_mode(BlendMode::Src);
    assert!(state.blend_enable);
    assert_eq!(state.blend_params.dst_color_blend_factor, BlendFactor::Zero);
  }
}
