use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            SignatureArray, SignatureField, SignatureLocalVariable, SignatureLocalVariables,
            SignatureMethod, SignatureModifier, SignatureParameter, SignaturePointer,
            SignatureProperty, SignatureSzArray, SignatureTypeArgument, SignatureTypeSpec,
            TypeSignature, SIGNATURE_HEADER,
        },
        typesystem::ELEMENT_TYPE,
    },
    Error::RecursionLimit,
    Result,
};

/// Default maximum recursion depth for signature parsing
pub const MAX_RECURSION_DEPTH: usize = 64;

/// Signature parser that handles the signature kinds the importer decodes (ECMA-335 II.23.2)
///
/// # Example
///
/// ```rust
/// use dotimport::metadata::signatures::{SignatureParser, TypeSignature};
/// let data = &[0x20, 0x01, 0x01, 0x0E];
/// let mut parser = SignatureParser::new(data);
/// let sig = parser.parse_method_signature()?;
/// assert_eq!(sig.params.len(), 1);
/// assert_eq!(sig.params[0].base, TypeSignature::String);
/// # Ok::<(), dotimport::Error>(())
/// ```
///
/// A parser instance is meant for exactly one blob; create a new one per signature.
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` from a byte slice
    ///
    /// ## Arguments
    /// * 'data' - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_max_depth(data, MAX_RECURSION_DEPTH)
    }

    /// Create a new `SignatureParser` with a custom nesting limit
    ///
    /// ## Arguments
    /// * 'data' - The byte slice to read from
    /// * 'max_depth' - Nesting depth at which parsing fails with [`crate::Error::RecursionLimit`]
    #[must_use]
    pub fn with_max_depth(data: &'a [u8], max_depth: usize) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
            max_depth,
        }
    }

    /// `true` if bytes remain after what has been parsed so far
    #[must_use]
    pub fn has_trailing_data(&self) -> bool {
        self.parser.has_more_data()
    }

    /// Parse a single type from the signature blob
    ///
    /// # Errors
    /// Returns an error on truncated data, unknown element types or excessive nesting.
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= self.max_depth {
            return Err(RecursionLimit(self.max_depth));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(SignaturePointer {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            })),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.parser.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let modifiers = self.parse_custom_mods()?;
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;
                if rank == 0 {
                    return Err(malformed_error!("ARRAY - rank must not be zero"));
                }

                let num_sizes = self.parser.read_compressed_uint()?;
                if num_sizes > rank {
                    return Err(malformed_error!(
                        "ARRAY - {} sizes for rank {}",
                        num_sizes,
                        rank
                    ));
                }
                let mut sizes = Vec::with_capacity(num_sizes as usize);
                for _ in 0..num_sizes {
                    sizes.push(self.parser.read_compressed_uint()?);
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                if num_lo_bounds > rank {
                    return Err(malformed_error!(
                        "ARRAY - {} lower bounds for rank {}",
                        num_lo_bounds,
                        rank
                    ));
                }
                let mut lower_bounds = Vec::with_capacity(num_lo_bounds as usize);
                for _ in 0..num_lo_bounds {
                    lower_bounds.push(self.parser.read_compressed_int()?);
                }

                Ok(TypeSignature::Array(SignatureArray {
                    modifiers,
                    base: Box::new(elem_type),
                    rank,
                    sizes,
                    lower_bounds,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;
                if arg_count == 0 {
                    return Err(malformed_error!("GENERICINST - zero type arguments"));
                }

                let mut type_args = Vec::with_capacity(arg_count.min(64) as usize);
                for _ in 0..arg_count {
                    type_args.push(SignatureTypeArgument {
                        modifiers: self.parse_custom_mods()?,
                        base: self.parse_type()?,
                    });
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(SignatureSzArray {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            })),
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                current_byte
            )),
        }
    }

    /// Parse custom modifiers (`CMOD_OPT` or `CMOD_REQD`)
    fn parse_custom_mods(&mut self) -> Result<Vec<SignatureModifier>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let is_required = match self.parser.peek_byte()? {
                ELEMENT_TYPE::CMOD_REQD => true,
                ELEMENT_TYPE::CMOD_OPT => false,
                _ => break,
            };

            self.parser.advance()?;
            mods.push(SignatureModifier {
                is_required,
                modifier_type: self.parser.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    /// Parse a parameter including custom modifiers (`return_type` counts as parameter)
    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let mut modifiers = self.parse_custom_mods()?;

        let mut ref_modifiers = Vec::new();
        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance()?;
            by_ref = true;
            ref_modifiers = modifiers;
            modifiers = self.parse_custom_mods()?;
        }

        Ok(SignatureParameter {
            ref_modifiers,
            by_ref,
            modifiers,
            base: self.parse_type()?,
        })
    }

    fn parse_method_header(&mut self) -> Result<(u8, u32, u32)> {
        let header = self.parser.read_le::<u8>()?;
        let kind = header & SIGNATURE_HEADER::KIND_MASK;
        if kind > SIGNATURE_HEADER::VARARG && kind != SIGNATURE_HEADER::UNMANAGED {
            return Err(malformed_error!(
                "SignatureMethod - invalid calling convention - {}",
                header
            ));
        }

        let param_count_generic = if header & SIGNATURE_HEADER::GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()?;

        Ok((header, param_count_generic, param_count))
    }

    /// Parse a method signature from the blob - `MethodDefSig`, `MethodRefSig`, `StandAloneMethodSig`
    ///
    /// # Errors
    /// Returns an error if the signature data is malformed or if reading beyond the buffer bounds.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let (header, param_count_generic, param_count) = self.parse_method_header()?;

        let mut method = SignatureMethod {
            header,
            param_count_generic,
            return_type: self.parse_param()?,
            params: Vec::new(),
            varargs: Vec::new(),
        };

        let mut in_varargs = false;
        for _ in 0..param_count {
            if !in_varargs && self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                // Everything after the sentinel is the vararg part of a call site
                self.parser.advance()?;
                in_varargs = true;
            }

            let param = self.parse_param()?;
            if in_varargs {
                method.varargs.push(param);
            } else {
                method.params.push(param);
            }
        }

        Ok(method)
    }

    /// Parse a method signature, replacing every slot from the first unparsable one
    /// onwards with [`TypeSignature::Unknown`].
    ///
    /// The declared parameter count is preserved, so callers can still report a method
    /// of the right shape whose broken parameters carry sentinel types. Trailing bytes
    /// after the last parameter are ignored.
    ///
    /// # Errors
    /// Returns an error only if the header or the parameter count cannot be read.
    pub fn parse_method_signature_lenient(&mut self) -> Result<SignatureMethod> {
        let (header, param_count_generic, param_count) = self.parse_method_header()?;

        let mut failed = false;
        let return_type = match self.parse_param() {
            Ok(param) => param,
            Err(error) => {
                log::debug!("return type of method signature could not be parsed - {error}");
                failed = true;
                SignatureParameter::default()
            }
        };

        let mut params = Vec::with_capacity(param_count.min(256) as usize);
        for index in 0..param_count {
            if !failed {
                match self.parse_param() {
                    Ok(param) => {
                        params.push(param);
                        continue;
                    }
                    Err(error) => {
                        log::debug!("parameter {index} of method signature could not be parsed - {error}");
                        failed = true;
                    }
                }
            }
            params.push(SignatureParameter::default());
        }

        if !failed && self.parser.has_more_data() {
            log::debug!(
                "method signature has {} trailing bytes",
                self.parser.remaining()
            );
        }

        Ok(SignatureMethod {
            header,
            param_count_generic,
            return_type,
            params,
            varargs: Vec::new(),
        })
    }

    /// Parse a field signature from the blob (II.23.2.4)
    ///
    /// # Errors
    /// Returns an error if the signature header is invalid or if the field type cannot be parsed.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte & SIGNATURE_HEADER::KIND_MASK != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        let param = self.parse_param()?;
        Ok(SignatureField {
            ref_modifiers: param.ref_modifiers,
            by_ref: param.by_ref,
            modifiers: param.modifiers,
            base: param.base,
        })
    }

    /// Parse a property signature from the blob (II.23.2.5)
    ///
    /// # Errors
    /// Returns an error if the property signature header is invalid or if the property type cannot be parsed.
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let header = self.parser.read_le::<u8>()?;
        if header & SIGNATURE_HEADER::KIND_MASK != SIGNATURE_HEADER::PROPERTY {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {}",
                header
            ));
        }

        let param_count = self.parser.read_compressed_uint()?;
        let property_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(256) as usize);
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            header,
            property_type,
            params,
        })
    }

    /// Parse a local variable signature from the blob (II.23.2.6)
    ///
    /// # Errors
    /// Returns an error if the header is not `LOCAL_SIG` or a local cannot be parsed.
    pub fn parse_local_var_signature(&mut self) -> Result<SignatureLocalVariables> {
        let header = self.parser.read_le::<u8>()?;
        if header != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(malformed_error!(
                "SignatureLocalVariables - invalid start - {}",
                header
            ));
        }

        let count = self.parser.read_compressed_uint()?;
        let mut locals = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::TYPEDBYREF {
                self.parser.advance()?;
                locals.push(SignatureLocalVariable {
                    base: TypeSignature::TypedByRef,
                    ..SignatureLocalVariable::default()
                });
                continue;
            }

            let mut local = SignatureLocalVariable {
                modifiers: self.parse_custom_mods()?,
                ..SignatureLocalVariable::default()
            };
            if self.parser.peek_byte()? == ELEMENT_TYPE::PINNED {
                self.parser.advance()?;
                local.is_pinned = true;
            }
            if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
                self.parser.advance()?;
                local.by_ref = true;
            }
            local.base = self.parse_type()?;
            locals.push(local);
        }

        Ok(SignatureLocalVariables { locals })
    }

    /// Parse a type specification signature from the blob (II.23.2.14)
    ///
    /// # Errors
    /// Returns an error if the type specification cannot be parsed.
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        let type_sig = self.parse_type()?;
        Ok(SignatureTypeSpec { base: type_sig })
    }
}
