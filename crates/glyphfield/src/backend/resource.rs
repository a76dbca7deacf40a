//! Scoped ownership of GPU objects.
//!
//! Every object the crate creates lives in an [`Owned`] guard that deletes it
//! on drop, so error paths halfway through building a font release whatever
//! was already allocated.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::Backend;

/// A kind of GPU object and how to delete it.
pub trait Resource<B: Backend> {
    type Handle: Copy + fmt::Debug;
    const NAME: &'static str;

    fn release(backend: &B, handle: Self::Handle);
}

#[derive(Debug)]
pub struct ProgramKind;
#[derive(Debug)]
pub struct BufferKind;
#[derive(Debug)]
pub struct TextureKind;
#[derive(Debug)]
pub struct FramebufferKind;
#[derive(Debug)]
pub struct VertexArrayKind;

impl<B: Backend> Resource<B> for ProgramKind {
    type Handle = B::Program;
    const NAME: &'static str = "program";

    fn release(backend: &B, handle: Self::Handle) {
        backend.delete_program(handle);
    }
}

impl<B: Backend> Resource<B> for BufferKind {
    type Handle = B::Buffer;
    const NAME: &'static str = "buffer";

    fn release(backend: &B, handle: Self::Handle) {
        backend.delete_buffer(handle);
    }
}

impl<B: Backend> Resource<B> for TextureKind {
    type Handle = B::Texture;
    const NAME: &'static str = "texture";

    fn release(backend: &B, handle: Self::Handle) {
        backend.delete_texture(handle);
    }
}

impl<B: Backend> Resource<B> for FramebufferKind {
    type Handle = B::Framebuffer;
    const NAME: &'static str = "framebuffer";

    fn release(backend: &B, handle: Self::Handle) {
        backend.delete_framebuffer(handle);
    }
}

impl<B: Backend> Resource<B> for VertexArrayKind {
    type Handle = B::VertexArray;
    const NAME: &'static str = "vertex array";

    fn release(backend: &B, handle: Self::Handle) {
        backend.delete_vertex_array(handle);
    }
}

/// GPU object deleted when the guard drops.
pub struct Owned<B: Backend, K: Resource<B>> {
    backend: Rc<B>,
    handle: K::Handle,
    _kind: PhantomData<K>,
}

pub type OwnedProgram<B> = Owned<B, ProgramKind>;
pub type OwnedBuffer<B> = Owned<B, BufferKind>;
pub type OwnedTexture<B> = Owned<B, TextureKind>;
pub type OwnedFramebuffer<B> = Owned<B, FramebufferKind>;
pub type OwnedVertexArray<B> = Owned<B, VertexArrayKind>;

impl<B: Backend, K: Resource<B>> Owned<B, K> {
    /// Take ownership of an existing handle.
    pub fn adopt(backend: Rc<B>, handle: K::Handle) -> Self {
        Self {
            backend,
            handle,
            _kind: PhantomData,
        }
    }

    pub fn handle(&self) -> K::Handle {
        self.handle
    }
}

impl<B: Backend> OwnedBuffer<B> {
    pub fn create(backend: &Rc<B>) -> crate::Result<Self> {
        let handle = backend
            .create_buffer()
            .map_err(|e| crate::Error::allocation(<BufferKind as Resource<B>>::NAME, e))?;
        Ok(Self::adopt(Rc::clone(backend), handle))
    }
}

impl<B: Backend> OwnedTexture<B> {
    pub fn create(backend: &Rc<B>) -> crate::Result<Self> {
        let handle = backend
            .create_texture()
            .map_err(|e| crate::Error::allocation(<TextureKind as Resource<B>>::NAME, e))?;
        Ok(Self::adopt(Rc::clone(backend), handle))
    }
}

impl<B: Backend> OwnedFramebuffer<B> {
    pub fn create(backend: &Rc<B>) -> crate::Result<Self> {
        let handle = backend
            .create_framebuffer()
            .map_err(|e| crate::Error::allocation(<FramebufferKind as Resource<B>>::NAME, e))?;
        Ok(Self::adopt(Rc::clone(backend), handle))
    }
}

impl<B: Backend> OwnedVertexArray<B> {
    pub fn create(backend: &Rc<B>) -> crate::Result<Self> {
        let handle = backend
            .create_vertex_array()
            .map_err(|e| crate::Error::allocation(<VertexArrayKind as Resource<B>>::NAME, e))?;
        Ok(Self::adopt(Rc::clone(backend), handle))
    }
}

impl<B: Backend, K: Resource<B>> Drop for Owned<B, K> {
    fn drop(&mut self) {
        K::release(&self.backend, self.handle);
    }
}

impl<B: Backend, K: Resource<B>> fmt::Debug for Owned<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(K::NAME).field(&self.handle).finish()
    }
}
