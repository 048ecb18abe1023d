//! C++ node tables and declaration query.
//!
//! Out-of-class definitions (`void Widget::draw()`) are named and given a
//! receiver from their qualified declarator during conversion.

use phf::phf_map;

use crate::parser::NodeKind;

pub(super) const DECLARATION_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name
  )
) @function

(function_definition
  declarator: (function_declarator
    declarator: (field_identifier) @name
  )
) @function

(class_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)
) @class

(struct_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)
) @class
"#;

pub(super) static KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "translation_unit" => NodeKind::Module,
    "function_definition" => NodeKind::Function,
    "lambda_expression" => NodeKind::Lambda,
    "parameter_list" => NodeKind::Parameters,
    "parameter_declaration" => NodeKind::Parameter,
    "optional_parameter_declaration" => NodeKind::Parameter,
    "compound_statement" => NodeKind::Block,
    "if_statement" => NodeKind::If,
    "conditional_expression" => NodeKind::If,
    "while_statement" => NodeKind::While,
    "do_statement" => NodeKind::While,
    "for_statement" => NodeKind::For,
    "for_range_loop" => NodeKind::ForEach,
    "try_statement" => NodeKind::Try,
    "catch_clause" => NodeKind::Catch,
    "call_expression" => NodeKind::Call,
    "new_expression" => NodeKind::Call,
    "assignment_expression" => NodeKind::Assignment,
    "declaration" => NodeKind::Declaration,
    "init_declarator" => NodeKind::Declaration,
    "preproc_def" => NodeKind::ConstDecl,
    "enumerator" => NodeKind::ConstDecl,
    "subscript_expression" => NodeKind::Subscript,
    "update_expression" => NodeKind::Update,
    "binary_expression" => NodeKind::Binary,
    "unary_expression" => NodeKind::Unary,
    "pointer_expression" => NodeKind::Unary,
    "return_statement" => NodeKind::Return,
    "preproc_include" => NodeKind::Import,
    "using_declaration" => NodeKind::Import,
    "field_expression" => NodeKind::Member,
    "qualified_identifier" => NodeKind::Member,
    "identifier" => NodeKind::Identifier,
    "this" => NodeKind::Identifier,
    "field_identifier" => NodeKind::Property,
    "number_literal" => NodeKind::Number,
    "string_literal" => NodeKind::String,
    "raw_string_literal" => NodeKind::String,
    "char_literal" => NodeKind::String,
    "true" => NodeKind::Boolean,
    "false" => NodeKind::Boolean,
    "null" => NodeKind::Boolean,
    "nullptr" => NodeKind::Boolean,
    "initializer_list" => NodeKind::Collection,
    "expression_statement" => NodeKind::ExprStatement,
    "comment" => NodeKind::Comment,
};

pub(super) fn grammar() -> tree_sitter::Language {
    tree_sitter_cpp::LANGUAGE.into()
}
