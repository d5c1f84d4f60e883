use std::marker::PhantomData;

/// Dense register identifier: every value maps to one slot in `0..COUNT`.
pub trait Register: Copy {
    /// Number of distinct registers in the set.
    const COUNT: usize;

    fn index(self) -> usize;
}

/// Declares a fieldless register enum and its [`Register`] implementation.
///
/// Variants are numbered from zero in declaration order, which is also the
/// slot order inside a [`RegisterFile`].
macro_rules! register_set {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every register of the set, in slot order.
            #[allow(dead_code)]
            pub const ALL: [$name; [$($name::$variant),+].len()] = [$($name::$variant),+];
        }

        impl $crate::register_file::Register for $name {
            const COUNT: usize = [$($name::$variant),+].len();

            #[inline]
            fn index(self) -> usize {
                self as usize
            }
        }
    };
}

pub(crate) use register_set;

/// Bank of 8-bit cells, one per register of `R`.
///
/// `N` must equal `R::COUNT`; this is checked when the file is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile<R: Register, const N: usize> {
    cells: [u8; N],
    _registers: PhantomData<R>,
}

impl<R: Register, const N: usize> Default for RegisterFile<R, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Register, const N: usize> RegisterFile<R, N> {
    /// # Panics
    /// If `N` differs from the number of registers in `R`.
    pub fn new() -> Self {
        assert_eq!(N, R::COUNT, "register file size does not match register set");
        Self {
            cells: [0; N],
            _registers: PhantomData,
        }
    }

    #[inline]
    pub fn get(&self, reg: R) -> u8 {
        self.cells[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: R, value: u8) {
        self.cells[reg.index()] = value;
    }

    /// # Panics
    /// If `bit` is not in `0..8`.
    #[inline]
    pub fn test_bit(&self, reg: R, bit: usize) -> bool {
        assert!(bit < 8, "bit index {bit} outside an 8-bit register");
        self.get(reg) & (1 << bit) != 0
    }

    /// # Panics
    /// If `bit` is not in `0..8`.
    #[inline]
    pub fn set_bit(&mut self, reg: R, bit: usize, value: bool) {
        assert!(bit < 8, "bit index {bit} outside an 8-bit register");
        let mask = 1u8 << bit;
        let current = self.get(reg);
        self.set(reg, if value { current | mask } else { current & !mask });
    }

    /// Raw cells in slot order.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.cells
    }

    pub(crate) fn load_bytes(&mut self, bytes: [u8; N]) {
        self.cells = bytes;
    }
}
