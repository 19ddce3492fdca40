//! Calling functions with tuple arguments unpacked
//!
//! [`Starmap`] lets a tuple `(a, b, c)` drive a function taking `a, b, c` as
//! separate parameters. It is implemented for functions of one to four
//! parameters.

use std::future::Future;

/// A function that can be called with its arguments packed in a tuple
pub trait Starmap<Args>: Send + Sync + 'static {
    /// Future returned by the call
    type Future: Future + Send + 'static;

    /// Unpack `args` and call the function
    fn apply(&self, args: Args) -> Self::Future;
}

macro_rules! impl_starmap {
    ($($arg:ident),+) => {
        impl<Func, Fut, $($arg),+> Starmap<($($arg,)+)> for Func
        where
            Func: Fn($($arg),+) -> Fut + Send + Sync + 'static,
            Fut: Future + Send + 'static,
        {
            type Future = Fut;

            #[allow(non_snake_case)]
            fn apply(&self, ($($arg,)+): ($($arg,)+)) -> Fut {
                self($($arg),+)
            }
        }
    };
}

impl_starmap!(A);
impl_starmap!(A, B);
impl_starmap!(A, B, C);
impl_starmap!(A, B, C, D);
