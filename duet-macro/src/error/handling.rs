use syn::{GenericArgument, PathArguments, ReturnType, Type};

/// 错误处理器
///
/// 负责校验接口方法的返回类型。
pub struct ErrorHandler;

const EXPECTED: &str = "Return type must be duet_common::Result<DualResponse<S, E>>";

impl ErrorHandler {
    /// 验证并解析返回类型
    ///
    /// 确保函数返回类型为 `Result<DualResponse<S, E>>` 格式，并提取成功类型 `S` 与错误类型 `E`。
    pub fn validate_and_extract_return_types(
        output: &ReturnType,
    ) -> Result<(&Type, &Type), syn::Error> {
        match output {
            ReturnType::Type(_, ty) => {
                let result_args = Self::generic_args(ty, "Result", 1)?;
                let dual = match &result_args[0] {
                    GenericArgument::Type(dual) => dual,
                    other => return Err(syn::Error::new_spanned(other, EXPECTED)),
                };
                let dual_args = Self::generic_args(dual, "DualResponse", 2)?;
                match (&dual_args[0], &dual_args[1]) {
                    (GenericArgument::Type(success), GenericArgument::Type(error)) => {
                        Ok((success, error))
                    }
                    _ => Err(syn::Error::new_spanned(dual, EXPECTED)),
                }
            }
            _ => Err(syn::Error::new_spanned(output, "Function must return duet_common::Result<DualResponse<S, E>>")),
        }
    }

    /// 取出 `Name<..>` 的泛型参数并检查个数
    fn generic_args<'a>(
        ty: &'a Type,
        name: &str,
        count: usize,
    ) -> Result<Vec<&'a GenericArgument>, syn::Error> {
        let type_path = match ty {
            Type::Path(type_path) => type_path,
            _ => return Err(syn::Error::new_spanned(ty, EXPECTED)),
        };
        let last_segment = type_path
            .path
            .segments
            .last()
            .ok_or_else(|| syn::Error::new_spanned(type_path, "Return type path must not be empty"))?;

        if last_segment.ident != name {
            return Err(syn::Error::new_spanned(type_path, EXPECTED));
        }

        let args = match &last_segment.arguments {
            PathArguments::AngleBracketed(args) => args,
            _ => {
                return Err(syn::Error::new_spanned(
                    ty,
                    format!("{} must have generic arguments", name),
                ));
            }
        };

        if args.args.len() != count {
            return Err(syn::Error::new_spanned(
                ty,
                format!("{} must have exactly {} type parameter(s)", name, count),
            ));
        }

        Ok(args.args.iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::{ReturnType, parse_quote};

    #[test]
    fn test_validate_correct_return_type() {
        let return_type: ReturnType =
            parse_quote! { -> duet_common::Result<DualResponse<String, ErrorDto>> };
        let (success, error) = ErrorHandler::validate_and_extract_return_types(&return_type).unwrap();
        assert_eq!(quote!(#success).to_string(), "String");
        assert_eq!(quote!(#error).to_string(), "ErrorDto");
    }

    #[test]
    fn test_validate_unit_branch() {
        let return_type: ReturnType = parse_quote! { -> Result<DualResponse<(), String>> };
        assert!(ErrorHandler::validate_and_extract_return_types(&return_type).is_ok());
    }

    #[test]
    fn test_validate_incorrect_return_type() {
        let return_type: ReturnType = parse_quote! { -> Result<String, Error> };
        let result = ErrorHandler::validate_and_extract_return_types(&return_type);
        assert!(result.is_err());

        let return_type: ReturnType = parse_quote! { -> anyhow::Result<String> };
        let error = ErrorHandler::validate_and_extract_return_types(&return_type).err().unwrap();
        assert_eq!(error.to_string(), EXPECTED);
    }

    #[test]
    fn test_validate_no_return_type() {
        let return_type = ReturnType::Default;
        let result = ErrorHandler::validate_and_extract_return_types(&return_type);
        assert!(result.is_err());
    }
}
