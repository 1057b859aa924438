use nu_ansi_term::Color;

pub mod catppuccin {
    use nu_ansi_term::Color;

    pub struct Mocha;
    impl Mocha {
        pub const TEXT: Color = Color::Rgb(205, 214, 244);
        pub const SURFACE2: Color = Color::Rgb(108, 112, 134); // Subtle dim
        pub const BASE: Color = Color::Rgb(30, 30, 46);

        pub const RED: Color = Color::Rgb(243, 139, 168);
        pub const GREEN: Color = Color::Rgb(166, 227, 161);
        pub const YELLOW: Color = Color::Rgb(249, 226, 175);
        pub const BLUE: Color = Color::Rgb(137, 180, 250);
        pub const MAUVE: Color = Color::Rgb(203, 166, 247);
        pub const PEACH: Color = Color::Rgb(250, 179, 135);
        pub const TEAL: Color = Color::Rgb(148, 226, 213);
        pub const SKY: Color = Color::Rgb(137, 220, 235);
    }

    pub struct Latte;
    impl Latte {
        pub const TEXT: Color = Color::Rgb(76, 79, 105);
        pub const SURFACE2: Color = Color::Rgb(172, 176, 190);
        pub const BASE: Color = Color::Rgb(239, 241, 245);

        pub const RED: Color = Color::Rgb(210, 15, 57);
        pub const GREEN: Color = Color::Rgb(64, 160, 43);
        pub const YELLOW: Color = Color::Rgb(223, 142, 29);
        pub const BLUE: Color = Color::Rgb(30, 102, 245);
        pub const MAUVE: Color = Color::Rgb(136, 57, 239);
        pub const PEACH: Color = Color::Rgb(254, 100, 11);
        pub const TEAL: Color = Color::Rgb(23, 146, 153);
        pub const SKY: Color = Color::Rgb(4, 165, 229);
    }
}

/// Colors used by the highlighter and the memory view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub text: Color,
    pub dim: Color,
    pub base: Color,
    pub accent: Color,

    pub op_right: Color,   // '>'
    pub op_left: Color,    // '<'
    pub op_inc: Color,     // '+'
    pub op_dec: Color,     // '-'
    pub op_output: Color,  // '.'
    pub op_input: Color,   // ','
    pub op_bracket: Color, // '[' and ']'
}

impl Palette {
    pub fn dark() -> Self {
        use catppuccin::Mocha as P;
        Self {
            text: P::TEXT,
            dim: P::SURFACE2,
            base: P::BASE,
            accent: P::BLUE,
            op_right: P::SKY,
            op_left: P::TEAL,
            op_inc: P::GREEN,
            op_dec: P::RED,
            op_output: P::YELLOW,
            op_input: P::PEACH,
            op_bracket: P::MAUVE,
        }
    }

    pub fn light() -> Self {
        use catppuccin::Latte as P;
        Self {
            text: P::TEXT,
            dim: P::SURFACE2,
            base: P::BASE,
            accent: P::BLUE,
            op_right: P::SKY,
            op_left: P::TEAL,
            op_inc: P::GREEN,
            op_dec: P::RED,
            op_output: P::YELLOW,
            op_input: P::PEACH,
            op_bracket: P::MAUVE,
        }
    }

    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode { Self::dark() } else { Self::light() }
    }
}
