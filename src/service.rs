//! Reflective service binding
//!
//! A service is declared as a record of methods, each tagged
//! `"<method> <id1> <id2> … <idN>"`: the method's wire name followed by
//! the field identities of its parameters and then of its returns, in
//! declaration order. [`MethodStub::parse`] turns one such tag into the
//! synthetic argument and result carriers that drive a
//! [`Client`]; the [`service_client!`](crate::service_client) macro
//! wraps a whole record into a typed client at compile time.
// (c) 2025 Ross Younger

use crate::client::Client;
use crate::codec::{CodecError, DynamicStruct, FieldDecl, StructDescriptor, TypeDescriptor, Value};
use crate::error::Error;

/// One bound service method: its wire name plus prototype argument and
/// result carriers. Built once at binding time, reused for every call.
#[derive(Debug)]
pub struct MethodStub {
    method: String,
    args: DynamicStruct,
    /// `None` requests oneway semantics (no reply is read).
    result: Option<DynamicStruct>,
}

impl MethodStub {
    /// Parses a method tag against the declared parameter and return
    /// shapes.
    ///
    /// The tag must supply at least as many identities as there are
    /// parameters plus returns; surplus identities are ignored. A method
    /// with no returns binds no result carrier, giving it oneway
    /// semantics.
    pub fn parse(
        tag: &str,
        args: &[(&str, TypeDescriptor)],
        results: &[TypeDescriptor],
    ) -> Result<Self, CodecError> {
        let mut tokens = tag.split_whitespace();
        let method = tokens
            .next()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| CodecError::construction(format!("method tag {tag:?} has no name")))?
            .to_string();
        let mut next_identity = || -> Result<i16, CodecError> {
            let token = tokens.next().ok_or_else(|| {
                CodecError::construction(format!(
                    "method tag {tag:?} has fewer identities than declared fields"
                ))
            })?;
            token.parse().map_err(|_| {
                CodecError::construction(format!(
                    "method tag {tag:?}: {token:?} is not a field identity"
                ))
            })
        };

        let mut arg_fields = Vec::with_capacity(args.len());
        for (name, descriptor) in args {
            let identity = next_identity()?;
            arg_fields.push(FieldDecl::new(
                *name,
                &identity.to_string(),
                descriptor.clone(),
            )?);
        }
        let args = DynamicStruct::new(StructDescriptor::new(
            format!("{method}_args"),
            arg_fields,
        )?)?;

        let result = if results.is_empty() {
            None
        } else {
            let mut result_fields = Vec::with_capacity(results.len());
            for (index, descriptor) in results.iter().enumerate() {
                let identity = next_identity()?;
                result_fields.push(FieldDecl::new(
                    format!("r{index}"),
                    &identity.to_string(),
                    descriptor.clone(),
                )?);
            }
            Some(DynamicStruct::new(StructDescriptor::new(
                format!("{method}_result"),
                result_fields,
            )?)?)
        };

        Ok(Self {
            method,
            args,
            result,
        })
    }

    /// The method's wire name
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the method reads no reply
    #[must_use]
    pub fn is_oneway(&self) -> bool {
        self.result.is_none()
    }

    /// Invokes the method: populates a fresh argument carrier from
    /// `args`, drives the client, and unpacks the result fields in
    /// declaration order (empty for oneway methods).
    pub async fn invoke<C: Client + ?Sized>(
        &self,
        client: &C,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, Error> {
        if args.len() != self.args.field_count() {
            return Err(CodecError::construction(format!(
                "{}: expected {} arguments, got {}",
                self.method,
                self.args.field_count(),
                args.len()
            ))
            .into());
        }
        let mut call_args = self.args.instantiate();
        for (index, value) in args.into_iter().enumerate() {
            call_args.set_field(index, value)?;
        }
        let Some(prototype) = &self.result else {
            client.call(&self.method, &call_args, None).await?;
            return Ok(Vec::new());
        };
        let mut result = prototype.instantiate();
        client
            .call(&self.method, &call_args, Some(&mut result))
            .await?;
        let mut values = Vec::with_capacity(result.field_count());
        for index in 0..result.field_count() {
            let value = result.take_field(index).ok_or_else(|| {
                CodecError::construction(format!("{}: result field {index} missing", self.method))
            })?;
            values.push(value);
        }
        Ok(values)
    }
}

/// Declares a typed service client.
///
/// Each method is given as `"<name> <ids…>" => fn method(args…) [-> T];`.
/// The macro expands to a wrapper struct over any [`Client`]
/// whose constructor parses every tag (malformed tags and identity
/// collisions surface there) and whose async methods marshal their
/// arguments through the codec layer, drive the client, and demarshal the
/// result. A method with no return type binds no result carrier and so
/// has oneway semantics.
///
/// ```
/// use thrifty::service_client;
///
/// service_client! {
///     /// Client for the Greeter service.
///     pub struct GreeterClient {
///         "greet 1 0" => fn greet(name: String) -> String;
///         "poke 1" => fn poke(who: String);
///     }
/// }
/// ```
#[macro_export]
macro_rules! service_client {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $tag:literal => fn $method:ident ( $( $arg:ident : $aty:ty ),* $(,)? )
                    $( -> $ret:ty )? ;
            )+
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug)]
        $vis struct $name<C: $crate::client::Client> {
            client: C,
            $( $method: $crate::service::MethodStub, )+
        }

        impl<C: $crate::client::Client> $name<C> {
            /// Binds the declared methods against a client.
            ///
            /// Fails if any method tag is malformed or declares fewer
            /// identities than the method has parameters and returns.
            $vis fn new(client: C) -> ::std::result::Result<Self, $crate::codec::CodecError> {
                Ok(Self {
                    $(
                        $method: $crate::service::MethodStub::parse(
                            $tag,
                            &[ $( (
                                stringify!($arg),
                                <$aty as $crate::codec::HostType>::descriptor(),
                            ) ),* ],
                            &[ $( <$ret as $crate::codec::HostType>::descriptor() )? ],
                        )?,
                    )+
                    client,
                })
            }

            $(
                #[doc = concat!("Invokes the remote `", stringify!($method), "` method.")]
                $vis async fn $method(
                    &self,
                    $( $arg: $aty ),*
                ) -> ::std::result::Result<($( $ret )?), $crate::Error> {
                    let mut returned = self
                        .$method
                        .invoke(
                            &self.client,
                            ::std::vec![ $(
                                <$aty as $crate::codec::HostType>::into_value($arg)
                            ),* ],
                        )
                        .await?
                        .into_iter();
                    let result = ( $(
                        <$ret as $crate::codec::HostType>::from_value(
                            returned.next().ok_or_else(|| {
                                $crate::ApplicationError::new(
                                    $crate::ApplicationErrorKind::MissingResult,
                                    concat!(stringify!($method), ": no result"),
                                )
                            })?,
                        )?
                    )? );
                    let _ = returned;
                    Ok(result)
                }
            )+
        }
    };
}
