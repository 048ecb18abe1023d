//! Go node tables and declaration query.

use phf::phf_map;

use crate::parser::NodeKind;

/// Captures functions, methods and struct types. Method receivers are
/// resolved from the receiver parameter list during conversion.
pub(super) const DECLARATION_QUERY: &str = r#"
(function_declaration
  name: (identifier) @name
) @function

(method_declaration
  name: (field_identifier) @name
) @function

(type_spec
  name: (type_identifier) @name
  type: (struct_type)
) @class
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "source_file" => NodeKind::Module,
    "function_declaration" => NodeKind::Function,
    "method_declaration" => NodeKind::Function,
    "func_literal" => NodeKind::Lambda,
    "parameter_list" => NodeKind::Parameters,
    "parameter_declaration" => NodeKind::Parameter,
    "variadic_parameter_declaration" => NodeKind::Parameter,
    "block" => NodeKind::Block,
    "if_statement" => NodeKind::If,
    // Refined to For / ForEach / While from its clause during conversion.
    "for_statement" => NodeKind::While,
    "defer_statement" => NodeKind::Finally,
    "call_expression" => NodeKind::Call,
    "assignment_statement" => NodeKind::Assignment,
    "short_var_declaration" => NodeKind::Declaration,
    "var_spec" => NodeKind::Declaration,
    "const_declaration" => NodeKind::ConstDecl,
    "index_expression" => NodeKind::Subscript,
    "inc_statement" => NodeKind::Update,
    "dec_statement" => NodeKind::Update,
    "binary_expression" => NodeKind::Binary,
    "unary_expression" => NodeKind::Unary,
    "return_statement" => NodeKind::Return,
    "import_declaration" => NodeKind::Import,
    "selector_expression" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "field_identifier" => NodeKind::Property,
    "int_literal" => NodeKind::Number,
    "float_literal" => NodeKind::Number,
    "imaginary_literal" => NodeKind::Number,
    "interpreted_string_literal" => NodeKind::String,
    "raw_string_literal" => NodeKind::String,
    "rune_literal" => NodeKind::String,
    "true" => NodeKind::Boolean,
    "false" => NodeKind::Boolean,
    "nil" => NodeKind::Boolean,
    "composite_literal" => NodeKind::Collection,
    "type_assertion_expression" => NodeKind::TypeCheck,
    "type_switch_statement" => NodeKind::TypeCheck,
    "expression_statement" => NodeKind::ExprStatement,
    "comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_go::LANGUAGE.into()
}
