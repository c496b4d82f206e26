//! Plain-data values yang boleh ditulis ke lane

/// Value yang bisa di-copy byte-per-byte ke/dari lane.
///
/// # Safety
/// Implementor harus valid untuk SEMUA bit pattern dan tidak punya padding,
/// karena `read` membangun value langsung dari bytes di block.
pub unsafe trait Element: Copy + 'static {}

macro_rules! impl_element {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Element for $t {})*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize, f32, f64);

unsafe impl<T: Element, const N: usize> Element for [T; N] {}
