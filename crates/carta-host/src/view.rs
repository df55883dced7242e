//! Read-only rectangular views.

use crate::args::ViewRequest;
use crate::{HostResult, Image};
use carta_core::RgbaBuffer;

/// A region of an image, as returned by [`Image::view`].
///
/// The view keeps its image alive. Its rectangle is stored as requested and
/// may extend past the image; reads are clipped.
#[derive(Clone, Debug)]
pub struct ImageView {
    image: Image,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl ImageView {
    pub(crate) fn new(image: Image, req: ViewRequest) -> Self {
        Self {
            image,
            x: req.x,
            y: req.y,
            width: req.width,
            height: req.height,
        }
    }

    /// The viewed image.
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Left edge in image coordinates.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Top edge in image coordinates.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Requested width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Requested height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel word at view coordinates, or `None` outside the view or the
    /// image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ix = self.x.checked_add(x)?;
        let iy = self.y.checked_add(y)?;
        self.image.buffer().read().pixel(ix, iy).ok()
    }

    /// Copies the visible part of the view into a new buffer.
    ///
    /// The copy is clipped to the image, so it may be smaller than the view.
    pub fn to_buffer(&self) -> HostResult<RgbaBuffer> {
        let src = self.image.buffer().read();
        let x0 = self.x.min(src.width());
        let y0 = self.y.min(src.height());
        let w = self.width.min(src.width() - x0);
        let h = self.height.min(src.height() - y0);

        let mut out = RgbaBuffer::new(w, h)?;
        for row in 0..h {
            let line = &src.row(y0 + row)[x0 as usize..(x0 + w) as usize];
            out.row_mut(row).copy_from_slice(line);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Env, Image, Value};

    fn numbered(env: &Env) -> Image {
        let img = Image::with_size(env, 3, 2).unwrap();
        for (i, p) in img.buffer().write().data_mut().iter_mut().enumerate() {
            *p = i as u32;
        }
        img
    }

    #[test]
    fn pixels_are_relative_and_clipped() {
        let env = Env::new().unwrap();
        let img = numbered(&env);
        let v = img.view(&[1.into(), 1.into(), 5.into(), 5.into()]).unwrap();
        let v = v.as_view().unwrap();
        assert_eq!(v.pixel(0, 0), Some(4));
        assert_eq!(v.pixel(1, 0), Some(5));
        assert_eq!(v.pixel(2, 0), None);
        assert_eq!(v.pixel(0, 1), None);
        assert!(v.image().ptr_eq(&img));
    }

    #[test]
    fn copy_is_clipped() {
        let env = Env::new().unwrap();
        let img = numbered(&env);
        let v = img.view(&[Value::from(1), 0.into(), 9.into(), 2.into()]).unwrap();
        let buf = v.as_view().unwrap().to_buffer().unwrap();
        assert_eq!((buf.width(), buf.height()), (2, 2));
        assert_eq!(buf.data(), &[1, 2, 4, 5]);
    }

    #[test]
    fn view_outside_image_is_empty() {
        let env = Env::new().unwrap();
        let img = numbered(&env);
        let v = img.view(&[9.into(), 9.into(), 1.into(), 1.into()]).unwrap();
        let v = v.as_view().unwrap();
        assert_eq!(v.pixel(0, 0), None);
        assert_eq!(v.to_buffer().unwrap().data().len(), 0);
    }
}
