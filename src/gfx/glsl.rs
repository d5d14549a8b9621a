//! GLSL 源码扫描
//!
//! 只识别全局作用域中的接口声明：顶点输入、loose uniform、uniform 块
//! 以及计算着色器的 `local_size_*`。不做预处理、不展开宏。
//!
//! GL 后端用它读取计算工作组尺寸；无头后端用它完成整套反射。

/// 一个全局 `in` 或 `uniform` 声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslDeclaration {
    pub name: String,
    /// GLSL 类型名，例如 `vec4`
    pub ty: String,
    pub array_size: u32,
    /// `layout(location = N)`
    pub location: Option<i32>,
    /// `layout(binding = N)`
    pub binding: Option<u32>,
}

/// 一个 uniform 块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslBlock {
    pub name: String,
    pub binding: Option<u32>,
    /// std140 布局下的字节数
    pub size: u32,
}

/// 一个着色器阶段的接口
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlslInterface {
    pub inputs: Vec<GlslDeclaration>,
    pub uniforms: Vec<GlslDeclaration>,
    pub blocks: Vec<GlslBlock>,
    /// 声明了 `local_size_*` 时为工作组尺寸，未声明的维度为 1
    pub local_size: Option<[u32; 3]>,
    pub has_main: bool,
}

const QUALIFIERS: &[&str] = &[
    "highp", "mediump", "lowp", "flat", "smooth", "noperspective", "centroid", "readonly",
    "writeonly", "coherent", "volatile", "restrict", "invariant", "precise",
];

/// 扫描一个阶段的源码
pub fn scan(source: &str) -> GlslInterface {
    let stripped = strip(source);
    let tokens = tokenize(&stripped);

    let mut interface = GlslInterface::default();
    let mut statement: Vec<&str> = Vec::new();
    let mut depth = 0usize;
    let mut block: Option<(GlslBlock, u32)> = None;

    for token in tokens {
        match token {
            "{" => {
                if depth == 0 {
                    let (layout, rest) = split_layout(&statement);
                    let rest = drop_qualifiers(&rest);
                    if rest.len() == 2 && rest[0] == "uniform" {
                        block = Some((
                            GlslBlock {
                                name: rest[1].to_string(),
                                binding: layout_value(&layout, "binding"),
                                size: 0,
                            },
                            0,
                        ));
                    }
                    if statement.windows(2).any(|w| w == ["main", "("]) {
                        interface.has_main = true;
                    }
                }
                depth += 1;
                statement.clear();
            }
            "}" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some((mut finished, offset)) = block.take() {
                        finished.size = round_up(offset, 16);
                        interface.blocks.push(finished);
                    }
                }
                statement.clear();
            }
            ";" => {
                if depth == 0 {
                    global_statement(&statement, &mut interface);
                } else if depth == 1 {
                    if let Some((_, offset)) = block.as_mut() {
                        let rest = drop_qualifiers(&statement);
                        if let Some(member) = declaration(&rest, &[]) {
                            let (size, align) = std140(&member.ty, member.array_size);
                            *offset = round_up(*offset, align) + size;
                        }
                    }
                }
                statement.clear();
            }
            _ => statement.push(token),
        }
    }

    interface
}

/// GLSL 类型名的 std140 (大小, 对齐)
pub fn std140(ty: &str, array_size: u32) -> (u32, u32) {
    let (size, align) = match ty {
        "float" | "int" | "uint" | "bool" => (4, 4),
        "vec2" | "ivec2" | "uvec2" | "bvec2" => (8, 8),
        "vec3" | "ivec3" | "uvec3" | "bvec3" => (12, 16),
        "vec4" | "ivec4" | "uvec4" | "bvec4" => (16, 16),
        "mat2" => (32, 16),
        "mat3" => (48, 16),
        "mat4" => (64, 16),
        _ => (16, 16),
    };
    if array_size > 1 {
        (round_up(size, 16) * array_size, 16)
    } else {
        (size, align)
    }
}

fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

fn global_statement(statement: &[&str], interface: &mut GlslInterface) {
    let (layout, rest) = split_layout(statement);
    let rest = drop_qualifiers(&rest);

    if rest == ["in"] && layout.iter().any(|(k, _)| k.starts_with("local_size_")) {
        interface.local_size = Some([
            layout_value(&layout, "local_size_x").unwrap_or(1),
            layout_value(&layout, "local_size_y").unwrap_or(1),
            layout_value(&layout, "local_size_z").unwrap_or(1),
        ]);
        return;
    }

    match rest.first() {
        Some(&"in") => {
            if let Some(decl) = declaration(&rest[1..], &layout) {
                interface.inputs.push(decl);
            }
        }
        Some(&"uniform") => {
            if let Some(decl) = declaration(&rest[1..], &layout) {
                interface.uniforms.push(decl);
            }
        }
        _ => {}
    }
}

/// `TYPE NAME [N]`
fn declaration(tokens: &[&str], layout: &[(String, Option<u32>)]) -> Option<GlslDeclaration> {
    let (ty, name) = match tokens {
        [ty, name, ..] if is_identifier(ty) && is_identifier(name) => (*ty, *name),
        _ => return None,
    };
    let array_size = match &tokens[2..] {
        ["[", n, "]", ..] => n.parse().unwrap_or(1),
        _ => 1,
    };
    Some(GlslDeclaration {
        name: name.to_string(),
        ty: ty.to_string(),
        array_size,
        location: layout_value(layout, "location").map(|v| v as i32),
        binding: layout_value(layout, "binding"),
    })
}

/// 拆出 `layout(...)` 中的键值对，返回其余 token
fn split_layout<'a>(statement: &[&'a str]) -> (Vec<(String, Option<u32>)>, Vec<&'a str>) {
    let mut layout = Vec::new();
    let mut rest = Vec::with_capacity(statement.len());
    let mut i = 0;

    while i < statement.len() {
        if statement[i] == "layout" && statement.get(i + 1) == Some(&"(") {
            i += 2;
            while i < statement.len() && statement[i] != ")" {
                let key = statement[i];
                if key == "," {
                    i += 1;
                    continue;
                }
                if statement.get(i + 1) == Some(&"=") {
                    layout.push((key.to_string(), statement.get(i + 2).and_then(|v| v.parse().ok())));
                    i += 3;
                } else {
                    layout.push((key.to_string(), None));
                    i += 1;
                }
            }
            i += 1;
        } else {
            rest.push(statement[i]);
            i += 1;
        }
    }

    (layout, rest)
}

fn layout_value(layout: &[(String, Option<u32>)], key: &str) -> Option<u32> {
    layout.iter().find(|(k, _)| k == key).and_then(|(_, v)| *v)
}

fn drop_qualifiers<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    tokens
        .iter()
        .copied()
        .filter(|t| !QUALIFIERS.contains(t))
        .collect()
}

fn is_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// 去掉注释和预处理行
fn strip(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
                out.push('\n');
                line_start = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            '#' if line_start => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
                out.push('\n');
            }
            '\n' => {
                out.push('\n');
                line_start = true;
            }
            c if c.is_whitespace() => out.push(c),
            c => {
                out.push(c);
                line_start = false;
            }
        }
    }

    out
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in source.char_indices() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            if start.is_none() {
                start = Some(i);
            }
            continue;
        }
        if let Some(s) = start.take() {
            tokens.push(&source[s..i]);
        }
        if !c.is_whitespace() {
            tokens.push(&source[i..i + c.len_utf8()]);
        }
    }
    if let Some(s) = start {
        tokens.push(&source[s..]);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_inputs_and_uniforms() {
        let source = r#"
            #version 430 core
            // position
            layout(location = 0) in vec3 a_position;
            layout (location=2) in highp vec2 a_uv; /* uv */
            uniform mat4 u_bones[4];
            uniform sampler2D u_albedo;
            out vec2 v_uv;
            void main() { vec4 p = vec4(a_position, 1.0); }
        "#;
        let interface = scan(source);

        assert_eq!(interface.inputs.len(), 2);
        assert_eq!(interface.inputs[1].name, "a_uv");
        assert_eq!(interface.inputs[1].location, Some(2));
        assert_eq!(interface.uniforms[0].array_size, 4);
        assert_eq!(interface.uniforms[1].ty, "sampler2D");
        assert!(interface.has_main);
        assert!(interface.local_size.is_none());
    }

    #[test]
    fn test_uniform_block_std140_size() {
        let source = r#"
            layout(std140, binding = 3) uniform Camera {
                mat4 view;
                vec3 eye;
                float exposure;
                vec2 jitter;
            } camera;
            void main() {}
        "#;
        let interface = scan(source);

        assert!(interface.uniforms.is_empty());
        assert_eq!(interface.blocks.len(), 1);
        assert_eq!(interface.blocks[0].name, "Camera");
        assert_eq!(interface.blocks[0].binding, Some(3));
        assert_eq!(interface.blocks[0].size, 96);
    }

    #[test]
    fn test_compute_local_size() {
        let source = "layout(local_size_x = 64) in;\nlayout(r32f, binding = 1) uniform writeonly image2D u_out;\nvoid main() {}";
        let interface = scan(source);
        assert_eq!(interface.local_size, Some([64, 1, 1]));
        assert_eq!(interface.uniforms[0].name, "u_out");
        assert_eq!(interface.uniforms[0].binding, Some(1));
    }

    #[test]
    fn test_missing_main() {
        assert!(!scan("uniform float u_time;").has_main);
    }
}
